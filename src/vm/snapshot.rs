use std::collections::BTreeMap;

use crate::{
    isa::Register,
    vm::{flags::Flags, memory::Address, registers::Value},
};

/// An immutable record of the machine state, captured after one executed
/// instruction and consumed by the step-through debugger.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Source line of the instruction that was just executed
    pub line: u32,
    pub flags: Flags,
    pub registers: BTreeMap<Register, Value>,
    pub memory: BTreeMap<Address, i64>,
    pub stack: Vec<Value>,
}
