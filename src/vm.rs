use crate::{isa::Register, vm::memory::Address};

/// Comparison flags.
pub mod flags;

/// Fetch-decode-execute loop.
pub mod machine;

/// Byte-addressable sparse memory.
pub mod memory;

/// Register file with narrow-register alias resolution.
pub mod registers;

/// Immutable per-instruction state snapshots.
pub mod snapshot;

/// Step-through debugger user interface.
pub mod tui;

pub use machine::{StepOutcome, Trace, Vm};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RuntimeError {
    #[error("register '{register}' used before it was set")]
    UnsetRegister { register: Register },
    #[error("no value has been stored at '{address}'")]
    UnsetMemory { address: Address },
    #[error("cannot use address '{address}' as a numeric value")]
    AddressAsValue { address: Address },
    #[error("pop from an empty stack")]
    EmptyStack,
    #[error("division by zero")]
    DivisionByZero,
    #[error("no resolved target for the jump or call at instruction {index}")]
    UnresolvedTarget { index: usize },
}

/// Simple utility function to run a program without the terminal user
/// interface. Returns the final register value, if any.
pub fn run(program: crate::assembler::parser::Program) -> Result<Option<i64>, RuntimeError> {
    Vm::new(program).run()
}
