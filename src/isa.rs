/// Operation kinds and resolved instructions.
pub mod instruction;

/// Instruction mnemonics recognized by the lexer.
pub mod mnemonic;

/// Typed instruction operands.
pub mod operand;

/// Register set, bit widths and the narrow-register alias table.
pub mod register;

pub use instruction::{AluOp, Condition, Instruction, MovKind, Op};
pub use mnemonic::Mnemonic;
pub use operand::Operand;
pub use register::Register;
