use std::collections::HashMap;

use lazy_static::lazy_static;

/// A named register.
///
/// The first nine variants are the canonical 64-bit registers that make up
/// the register file; they are declared in file order, which is also the
/// order the terminal `ret` scan walks them in. The remaining variants are
/// narrow views into a canonical register and resolve through
/// [`REGISTER_ALIASES`].
#[derive(
    Debug,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Clone,
    Copy,
    strum_macros::EnumString,
    strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Register {
    // 64-bit register file
    Rax,
    Rdi,
    Rsi,
    Rdx,
    Rcx,
    R8,
    R9,
    Rsp,
    Rbp,
    // 32-bit aliases
    Edi,
    Esi,
    Edx,
    Ecx,
    R8d,
    R9d,
    Eax,
    // 8-bit aliases
    Al,
    Dil,
    Sil,
    Dl,
    Cl,
    R8b,
    R9b,
}

/// Maps each narrow register to its owning 64-bit register and bit width.
#[derive(Debug)]
pub struct RegisterAliases {
    map: HashMap<Register, (Register, u8)>,
}

impl RegisterAliases {
    fn new() -> Self {
        let mut map = HashMap::new();

        let aliases = vec![
            (Register::Eax, Register::Rax, 32),
            (Register::Edi, Register::Rdi, 32),
            (Register::Esi, Register::Rsi, 32),
            (Register::Edx, Register::Rdx, 32),
            (Register::Ecx, Register::Rcx, 32),
            (Register::R8d, Register::R8, 32),
            (Register::R9d, Register::R9, 32),
            (Register::Al, Register::Rax, 8),
            (Register::Dil, Register::Rdi, 8),
            (Register::Sil, Register::Rsi, 8),
            (Register::Dl, Register::Rdx, 8),
            (Register::Cl, Register::Rcx, 8),
            (Register::R8b, Register::R8, 8),
            (Register::R9b, Register::R9, 8),
        ];
        for (narrow, owner, width) in aliases {
            map.insert(narrow, (owner, width));
        }

        Self { map }
    }

    /// Find the 64-bit register owning the given register.
    #[tracing::instrument]
    pub fn owning(&self, register: Register) -> Register {
        self.map
            .get(&register)
            .map(|(owner, _)| *owner)
            .unwrap_or(register)
    }

    /// Find the declared bit width of the given register.
    #[tracing::instrument]
    pub fn width(&self, register: Register) -> u8 {
        self.map.get(&register).map(|(_, width)| *width).unwrap_or(64)
    }
}

lazy_static! {
    pub static ref REGISTER_ALIASES: RegisterAliases = RegisterAliases::new();
}

impl Register {
    /// The register file in declaration order.
    pub const FILE: [Register; 9] = [
        Register::Rax,
        Register::Rdi,
        Register::Rsi,
        Register::Rdx,
        Register::Rcx,
        Register::R8,
        Register::R9,
        Register::Rsp,
        Register::Rbp,
    ];

    /// The 64-bit register this register is a view into.
    pub fn canonical(self) -> Register {
        REGISTER_ALIASES.owning(self)
    }

    pub fn width(self) -> u8 {
        REGISTER_ALIASES.width(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_from_str() {
        let tests = vec![
            ("rax", Register::Rax),
            ("rbp", Register::Rbp),
            ("r8", Register::R8),
            ("r8d", Register::R8d),
            ("r9b", Register::R9b),
            ("eax", Register::Eax),
            ("dil", Register::Dil),
        ];
        for (input, expected) in tests {
            assert_eq!(Register::from_str(input), Ok(expected));
        }
        assert!(Register::from_str("ax").is_err());
        assert!(Register::from_str("r10").is_err());
    }

    #[test]
    fn test_aliases() {
        let tests = vec![
            (Register::Rax, Register::Rax, 64),
            (Register::Eax, Register::Rax, 32),
            (Register::Al, Register::Rax, 8),
            (Register::Dil, Register::Rdi, 8),
            (Register::R8d, Register::R8, 32),
            (Register::R9b, Register::R9, 8),
            (Register::Rsp, Register::Rsp, 64),
        ];
        for (register, owner, width) in tests {
            assert_eq!(register.canonical(), owner);
            assert_eq!(register.width(), width);
        }
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(Register::Rax.to_string(), "rax");
        assert_eq!(Register::R8d.to_string(), "r8d");
    }
}
