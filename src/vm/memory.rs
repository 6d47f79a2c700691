use std::collections::BTreeMap;
use std::fmt;

use crate::vm::RuntimeError;

/// A memory location.
///
/// Stack-frame cells live at absolute small-integer addresses computed from
/// the base pointer; global data lives at its declared name plus a
/// positional byte index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    Absolute(i64),
    Symbol { name: String, index: i64 },
}

impl Address {
    pub fn symbol(name: &str) -> Self {
        Address::Symbol {
            name: name.to_owned(),
            index: 0,
        }
    }

    /// The address `by` cells further along.
    pub fn offset(&self, by: i64) -> Address {
        match self {
            Address::Absolute(address) => Address::Absolute(address + by),
            Address::Symbol { name, index } => Address::Symbol {
                name: name.clone(),
                index: index + by,
            },
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Absolute(address) => write!(f, "{}", address),
            Address::Symbol { name, index } if *index == 0 => write!(f, "{}", name),
            Address::Symbol { name, index } => write!(f, "{}{}", name, index),
        }
    }
}

/// Sparse byte-addressable memory.
///
/// Cells are never freed; everything written during one run stays until the
/// machine is discarded.
#[derive(Debug, Default, Clone)]
pub struct Memory {
    cells: BTreeMap<Address, i64>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the value stored at an address.
    #[tracing::instrument]
    pub fn load(&self, address: &Address) -> Result<i64, RuntimeError> {
        self.cells
            .get(address)
            .copied()
            .ok_or_else(|| RuntimeError::UnsetMemory {
                address: address.clone(),
            })
    }

    /// Writes a value into a single cell.
    #[tracing::instrument]
    pub fn store(&mut self, address: Address, value: i64) {
        self.cells.insert(address, value);
    }

    /// Writes a value sized by a register's bit width.
    ///
    /// Non-negative multi-byte values are decomposed into little-endian
    /// bytes across consecutive cells; 8-bit and negative values occupy one
    /// cell whole, so the sign survives a single-cell load.
    #[tracing::instrument]
    pub fn store_wide(&mut self, address: Address, value: i64, width: u8) {
        if width == 8 || value < 0 {
            self.store(address, value);
            return;
        }
        let bytes = value.to_le_bytes();
        for (index, byte) in bytes.iter().take(usize::from(width / 8)).enumerate() {
            self.store(address.offset(index as i64), i64::from(*byte));
        }
    }

    pub fn cells(&self) -> &BTreeMap<Address, i64> {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_load_unset_cell() {
        let memory = Memory::new();
        let error = memory.load(&Address::Absolute(-8)).unwrap_err();
        assert_eq!(
            error,
            RuntimeError::UnsetMemory {
                address: Address::Absolute(-8)
            }
        );
    }

    #[test]
    fn test_store_wide_decomposes_little_endian() {
        let mut memory = Memory::new();
        memory.store_wide(Address::Absolute(0), 0x0102, 64);

        assert_eq!(memory.load(&Address::Absolute(0)), Ok(0x02));
        assert_eq!(memory.load(&Address::Absolute(1)), Ok(0x01));
        assert_eq!(memory.load(&Address::Absolute(2)), Ok(0));
        assert_eq!(memory.load(&Address::Absolute(7)), Ok(0));
        assert!(memory.load(&Address::Absolute(8)).is_err());
    }

    #[test]
    fn test_store_wide_respects_width() {
        let mut memory = Memory::new();
        memory.store_wide(Address::Absolute(0), 5, 32);

        assert_eq!(memory.load(&Address::Absolute(0)), Ok(5));
        assert_eq!(memory.load(&Address::Absolute(3)), Ok(0));
        assert!(memory.load(&Address::Absolute(4)).is_err());
    }

    #[test]
    fn test_negative_values_stay_whole() {
        let mut memory = Memory::new();
        memory.store_wide(Address::Absolute(-8), -5, 64);

        assert_eq!(memory.load(&Address::Absolute(-8)), Ok(-5));
        assert!(memory.load(&Address::Absolute(-7)).is_err());
    }

    #[test]
    fn test_byte_width_stores_directly() {
        let mut memory = Memory::new();
        memory.store_wide(Address::Absolute(0), 300, 8);
        assert_eq!(memory.load(&Address::Absolute(0)), Ok(300));
        assert!(memory.load(&Address::Absolute(1)).is_err());
    }

    #[test]
    fn test_symbol_addressing() {
        let mut memory = Memory::new();
        memory.store(Address::symbol("g_x"), 72);
        memory.store(Address::symbol("g_x").offset(1), 105);

        assert_eq!(memory.load(&Address::symbol("g_x")), Ok(72));
        assert_eq!(memory.load(&Address::symbol("g_x").offset(1)), Ok(105));
        assert_eq!(Address::symbol("g_x").offset(1).to_string(), "g_x1");
        assert_eq!(Address::symbol("g_x").to_string(), "g_x");
    }
}
