/// Mnemonic of an instruction.
///
/// This represents the operation that is performed by the instruction.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, strum_macros::EnumString, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mnemonic {
    Mov,
    Movzb,
    Movsbq,
    Ret,
    Add,
    Sub,
    Imul,
    Idiv,
    Cqo,
    Neg,
    Push,
    Pop,
    Cmp,
    Sete,
    Setne,
    Setl,
    Setle,
    Lea,
    Jmp,
    Je,
    Call,
    Byte,
}

impl Mnemonic {
    /// Instructions that transfer control to a label.
    pub fn is_jumping_instruction(&self) -> bool {
        matches!(self, Mnemonic::Jmp | Mnemonic::Je | Mnemonic::Call)
    }

    pub fn is_arithmetic_instruction(&self) -> bool {
        matches!(
            self,
            Mnemonic::Add | Mnemonic::Sub | Mnemonic::Imul | Mnemonic::Idiv
        )
    }

    pub fn is_move_instruction(&self) -> bool {
        matches!(self, Mnemonic::Mov | Mnemonic::Movzb | Mnemonic::Movsbq)
    }

    /// Instructions that consume the comparison flags.
    pub fn is_conditional_set(&self) -> bool {
        matches!(
            self,
            Mnemonic::Sete | Mnemonic::Setne | Mnemonic::Setl | Mnemonic::Setle
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_from_str() {
        let tests = vec![
            ("mov", Mnemonic::Mov),
            ("movzb", Mnemonic::Movzb),
            ("movsbq", Mnemonic::Movsbq),
            ("ret", Mnemonic::Ret),
            ("imul", Mnemonic::Imul),
            ("sete", Mnemonic::Sete),
            ("lea", Mnemonic::Lea),
            ("byte", Mnemonic::Byte),
        ];
        for (input, expected) in tests {
            assert_eq!(Mnemonic::from_str(input), Ok(expected));
        }
        assert!(Mnemonic::from_str("frobnicate").is_err());
    }

    #[test]
    fn test_classification() {
        assert!(Mnemonic::Jmp.is_jumping_instruction());
        assert!(Mnemonic::Call.is_jumping_instruction());
        assert!(!Mnemonic::Ret.is_jumping_instruction());
        assert!(Mnemonic::Idiv.is_arithmetic_instruction());
        assert!(Mnemonic::Movsbq.is_move_instruction());
        assert!(Mnemonic::Setle.is_conditional_set());
        assert!(!Mnemonic::Cmp.is_conditional_set());
    }
}
