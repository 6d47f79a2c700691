use std::collections::BTreeMap;
use std::fmt;

use crate::{
    isa::Register,
    vm::{memory::Address, RuntimeError},
};

/// A value held by a register: a plain integer, or the symbolic memory
/// reference produced by `lea`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Ref(Address),
}

impl Value {
    /// The numeric value, treating an absolute address as its integer.
    pub fn as_int(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(value) => Ok(*value),
            Value::Ref(Address::Absolute(address)) => Ok(*address),
            Value::Ref(address) => Err(RuntimeError::AddressAsValue {
                address: address.clone(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Ref(address) => write!(f, "&{}", address),
        }
    }
}

/// The fixed register file.
///
/// Values are keyed by the canonical 64-bit register; reads and writes
/// through a narrow alias resolve to the owning register first. Every
/// register is unset until first written.
#[derive(Debug, Default, Clone)]
pub struct RegisterFile {
    values: BTreeMap<Register, Value>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a register, failing if it was never written.
    pub fn read(&self, register: Register) -> Result<Value, RuntimeError> {
        self.values
            .get(&register.canonical())
            .cloned()
            .ok_or(RuntimeError::UnsetRegister { register })
    }

    /// Reads a register, defaulting an unset one to `-1`.
    pub fn read_or_default(&self, register: Register) -> Value {
        self.values
            .get(&register.canonical())
            .cloned()
            .unwrap_or(Value::Int(-1))
    }

    pub fn write(&mut self, register: Register, value: Value) {
        self.values.insert(register.canonical(), value);
    }

    /// The first set register in declaration order, used by the terminal
    /// `ret` scan.
    pub fn first_set(&self) -> Option<Value> {
        Register::FILE
            .iter()
            .find_map(|register| self.values.get(register).cloned())
    }

    pub fn snapshot(&self) -> BTreeMap<Register, Value> {
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_unset_register_read_fails() {
        let registers = RegisterFile::new();
        assert_eq!(
            registers.read(Register::Rax),
            Err(RuntimeError::UnsetRegister {
                register: Register::Rax
            })
        );
        assert_eq!(registers.read_or_default(Register::Rax), Value::Int(-1));
    }

    #[test]
    fn test_alias_reads_through_owning_register() {
        let mut registers = RegisterFile::new();
        registers.write(Register::Al, Value::Int(1));

        assert_eq!(registers.read(Register::Rax), Ok(Value::Int(1)));
        assert_eq!(registers.read(Register::Eax), Ok(Value::Int(1)));

        registers.write(Register::Rdi, Value::Int(7));
        assert_eq!(registers.read(Register::Dil), Ok(Value::Int(7)));
    }

    #[test]
    fn test_first_set_follows_declaration_order() {
        let mut registers = RegisterFile::new();
        assert_eq!(registers.first_set(), None);

        registers.write(Register::Rbp, Value::Int(0));
        assert_eq!(registers.first_set(), Some(Value::Int(0)));

        registers.write(Register::Rdi, Value::Int(3));
        assert_eq!(registers.first_set(), Some(Value::Int(3)));

        registers.write(Register::Rax, Value::Int(9));
        assert_eq!(registers.first_set(), Some(Value::Int(9)));
    }

    #[test]
    fn test_error_names_the_register_as_written() {
        let registers = RegisterFile::new();
        let error = registers.read(Register::Al).unwrap_err();
        assert_eq!(error.to_string(), "register 'al' used before it was set");
    }
}
