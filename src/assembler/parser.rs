use std::collections::HashMap;
use std::str::FromStr;

use crate::{
    assembler::lexer::{Token, TokenKind},
    isa::{AluOp, Condition, Instruction, Mnemonic, MovKind, Op, Operand, Register},
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("expected '{expected}', got '{found}' at line {line}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: u32,
    },
    #[error("invalid numeric literal '{lexeme}' at line {line}")]
    InvalidNumber { lexeme: String, line: u32 },
    #[error("cannot jump to unknown label '{label}'")]
    UnresolvedLabel { label: String, line: u32 },
}

/// The parser's output: an immutable instruction sequence with its symbols
/// bound.
///
/// `targets` is parallel to `instructions`; for every jump and call it holds
/// the absolute index of the referenced definition. `symbols` maps every
/// label and global name to the index of its defining instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub targets: Vec<Option<usize>>,
    pub symbols: HashMap<String, usize>,
}

/// A jump or call waiting for its target to be defined.
#[derive(Debug)]
struct PendingReference {
    instruction: usize,
    target: String,
    line: u32,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    instructions: Vec<Instruction>,
    pending: Vec<PendingReference>,
    definitions: HashMap<String, usize>,
}

fn is_value_operand(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Number
            | TokenKind::Register(_)
            | TokenKind::Address
            | TokenKind::RelativeAddress
            | TokenKind::LocationAt
    )
}

fn is_place_operand(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Register(_)
            | TokenKind::Address
            | TokenKind::RelativeAddress
            | TokenKind::LocationAt
    )
}

fn is_address_operand(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Address | TokenKind::RelativeAddress | TokenKind::LocationAt
    )
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
            instructions: Vec::new(),
            pending: Vec::new(),
            definitions: HashMap::new(),
        }
    }

    fn last_line(&self) -> u32 {
        self.tokens.last().map(|token| token.line).unwrap_or(1)
    }

    /// Consume the current token if it matches, otherwise fail quoting the
    /// expected and actual kinds.
    fn expect(
        &mut self,
        expected: &str,
        matcher: impl Fn(&TokenKind) -> bool,
    ) -> Result<&'a Token, ParseError> {
        let token = self
            .tokens
            .get(self.position)
            .ok_or_else(|| ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: "end of input".to_string(),
                line: self.last_line(),
            })?;
        if !matcher(&token.kind) {
            return Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.to_string(),
                line: token.line,
            });
        }
        self.position += 1;
        Ok(token)
    }

    fn parse_i64(&self, lexeme: &str, line: u32) -> Result<i64, ParseError> {
        lexeme.parse().map_err(|_| ParseError::InvalidNumber {
            lexeme: lexeme.to_string(),
            line,
        })
    }

    /// `<disp>(<reg>)`, with a leading `_` marking a base-pointer-relative
    /// displacement.
    fn decode_displacement(&self, lexeme: &str, line: u32) -> Result<Operand, ParseError> {
        let (amount, rest) = lexeme.split_once('(').ok_or_else(|| {
            ParseError::InvalidNumber {
                lexeme: lexeme.to_string(),
                line,
            }
        })?;
        let name = rest.trim_end_matches(')');
        let base = Register::from_str(name).map_err(|_| ParseError::UnexpectedToken {
            expected: "register".to_string(),
            found: name.to_string(),
            line,
        })?;
        let displacement = match amount.strip_prefix('_') {
            Some(offset) => -self.parse_i64(offset, line)?,
            None => self.parse_i64(amount, line)?,
        };
        Ok(Operand::Indexed { base, displacement })
    }

    fn decode_operand(&self, token: &Token) -> Result<Operand, ParseError> {
        match &token.kind {
            TokenKind::Number => Ok(Operand::Immediate(
                self.parse_i64(&token.lexeme, token.line)?,
            )),
            TokenKind::Register(register) => Ok(Operand::Register(*register)),
            TokenKind::Address => {
                let offset = token.lexeme.trim_start_matches('_');
                match Register::from_str(offset) {
                    Ok(register) => Ok(Operand::StackSlotBy(register)),
                    Err(_) => Ok(Operand::StackSlot(self.parse_i64(offset, token.line)?)),
                }
            }
            TokenKind::RelativeAddress => self.decode_displacement(&token.lexeme, token.line),
            TokenKind::LocationAt => match Register::from_str(&token.lexeme) {
                Ok(register) => Ok(Operand::Indirect(register)),
                Err(_) => Ok(Operand::Global(format!("g_{}", token.lexeme))),
            },
            kind => Err(ParseError::UnexpectedToken {
                expected: "operand".to_string(),
                found: kind.to_string(),
                line: token.line,
            }),
        }
    }

    fn push_instruction(&mut self, op: Op, line: u32) {
        self.instructions.push(Instruction::new(op, line));
    }

    // mov $<number>|<register>|<memory>, <register>|<memory>
    fn parse_mov(&mut self, kind: MovKind, line: u32) -> Result<(), ParseError> {
        self.position += 1; // Consume the mnemonic
        let src = self.expect("number, register or memory operand", is_value_operand)?;
        let src = self.decode_operand(src)?;
        self.expect("comma", |kind| matches!(kind, TokenKind::Comma))?;
        let dst = self.expect("register or memory operand", is_place_operand)?;
        let dst = self.decode_operand(dst)?;
        self.push_instruction(Op::Mov { kind, src, dst }, line);
        Ok(())
    }

    // operator $<number>|<register>|<memory>, <register>
    // operator -> add/sub/imul/idiv
    fn parse_arithmetic(&mut self, op: AluOp, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let src = self.expect("number, register or memory operand", is_value_operand)?;
        let src = self.decode_operand(src)?;
        self.expect("comma", |kind| matches!(kind, TokenKind::Comma))?;
        let dst = self.expect_register()?;
        self.push_instruction(Op::Alu { op, src, dst }, line);
        Ok(())
    }

    // cmp $<number>|<register>|<memory>, <register>|<memory>
    fn parse_cmp(&mut self, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let src = self.expect("number, register or memory operand", is_value_operand)?;
        let src = self.decode_operand(src)?;
        self.expect("comma", |kind| matches!(kind, TokenKind::Comma))?;
        let dst = self.expect("number, register or memory operand", is_value_operand)?;
        let dst = self.decode_operand(dst)?;
        self.push_instruction(Op::Cmp { src, dst }, line);
        Ok(())
    }

    // neg <register> / sete <register> / pop <register>
    fn expect_register(&mut self) -> Result<Register, ParseError> {
        let token = self.expect("register", |kind| matches!(kind, TokenKind::Register(_)))?;
        match token.kind {
            TokenKind::Register(register) => Ok(register),
            _ => unreachable!("matcher admits registers only"),
        }
    }

    // push $<number>|<register>|<memory>
    fn parse_push(&mut self, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let src = self.expect("number, register or memory operand", is_value_operand)?;
        let src = self.decode_operand(src)?;
        self.push_instruction(Op::Push { src }, line);
        Ok(())
    }

    fn parse_pop(&mut self, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let dst = self.expect_register()?;
        self.push_instruction(Op::Pop { dst }, line);
        Ok(())
    }

    fn parse_neg(&mut self, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let dst = self.expect_register()?;
        self.push_instruction(Op::Neg { dst }, line);
        Ok(())
    }

    fn parse_set(&mut self, cond: Condition, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let dst = self.expect_register()?;
        self.push_instruction(Op::Set { cond, dst }, line);
        Ok(())
    }

    // lea <memory>, <register>
    fn parse_lea(&mut self, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let src = self.expect("memory operand", is_address_operand)?;
        let src = self.decode_operand(src)?;
        self.expect("comma", |kind| matches!(kind, TokenKind::Comma))?;
        let dst = self.expect_register()?;
        self.push_instruction(Op::Lea { src, dst }, line);
        Ok(())
    }

    // jmp/je/call .L<name>
    //
    // The reference is recorded against the instruction's own index so the
    // resolution pass can bind it once the definition is known.
    fn parse_jump(&mut self, mnemonic: Mnemonic, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let token = self.expect("label", |kind| matches!(kind, TokenKind::Label))?;
        let target = token.lexeme.clone();
        self.pending.push(PendingReference {
            instruction: self.instructions.len(),
            target: target.clone(),
            line,
        });
        let op = match mnemonic {
            Mnemonic::Jmp => Op::Jmp { target },
            Mnemonic::Je => Op::Je { target },
            Mnemonic::Call => Op::Call { target },
            _ => unreachable!("not a jumping mnemonic"),
        };
        self.push_instruction(op, line);
        Ok(())
    }

    // byte <number>
    fn parse_byte(&mut self, line: u32) -> Result<(), ParseError> {
        self.position += 1;
        let token = self.expect("number", |kind| matches!(kind, TokenKind::Number))?;
        let value = self.parse_i64(&token.lexeme, token.line)?;
        self.push_instruction(Op::Byte { value }, line);
        Ok(())
    }

    fn parse_instruction(&mut self, mnemonic: Mnemonic, line: u32) -> Result<(), ParseError> {
        match mnemonic {
            Mnemonic::Mov => self.parse_mov(MovKind::Mov, line),
            Mnemonic::Movzb => self.parse_mov(MovKind::Movzb, line),
            Mnemonic::Movsbq => self.parse_mov(MovKind::Movsbq, line),
            Mnemonic::Ret => {
                self.position += 1;
                self.push_instruction(Op::Ret, line);
                Ok(())
            }
            Mnemonic::Add => self.parse_arithmetic(AluOp::Add, line),
            Mnemonic::Sub => self.parse_arithmetic(AluOp::Sub, line),
            Mnemonic::Imul => self.parse_arithmetic(AluOp::Imul, line),
            Mnemonic::Idiv => self.parse_arithmetic(AluOp::Idiv, line),
            Mnemonic::Cqo => {
                self.position += 1;
                self.push_instruction(Op::Cqo, line);
                Ok(())
            }
            Mnemonic::Neg => self.parse_neg(line),
            Mnemonic::Push => self.parse_push(line),
            Mnemonic::Pop => self.parse_pop(line),
            Mnemonic::Cmp => self.parse_cmp(line),
            Mnemonic::Sete => self.parse_set(Condition::Equal, line),
            Mnemonic::Setne => self.parse_set(Condition::NotEqual, line),
            Mnemonic::Setl => self.parse_set(Condition::Less, line),
            Mnemonic::Setle => self.parse_set(Condition::LessOrEqual, line),
            Mnemonic::Lea => self.parse_lea(line),
            Mnemonic::Jmp | Mnemonic::Je | Mnemonic::Call => self.parse_jump(mnemonic, line),
            Mnemonic::Byte => self.parse_byte(line),
        }
    }

    /// `.L<name>:` - the definition binds to the marker's own index.
    fn parse_label_definition(&mut self) -> Result<(), ParseError> {
        let token = &self.tokens[self.position];
        let (name, line) = (token.lexeme.clone(), token.line);
        self.position += 1;
        self.expect("colon", |kind| matches!(kind, TokenKind::Colon))?;
        self.definitions.insert(name.clone(), self.instructions.len());
        self.push_instruction(Op::Label { name }, line);
        Ok(())
    }

    /// `.global <name>` - both a data declaration and a jump-target
    /// definition (the entry point is the `main` global).
    fn parse_global(&mut self) -> Result<(), ParseError> {
        let token = &self.tokens[self.position];
        let (name, line) = (token.lexeme.clone(), token.line);
        self.position += 1;
        self.definitions.insert(name.clone(), self.instructions.len());
        self.push_instruction(Op::Global { name }, line);
        Ok(())
    }

    /// Pass 2: rewrite every pending reference into an absolute instruction
    /// index, leaving the instruction list itself untouched.
    fn resolve(self) -> Result<Program, ParseError> {
        let mut targets = vec![None; self.instructions.len()];
        for reference in &self.pending {
            let definition = self.definitions.get(&reference.target).ok_or_else(|| {
                ParseError::UnresolvedLabel {
                    label: reference.target.clone(),
                    line: reference.line,
                }
            })?;
            targets[reference.instruction] = Some(*definition);
        }
        Ok(Program {
            instructions: self.instructions,
            targets,
            symbols: self.definitions,
        })
    }

    /// Parse the entire token sequence into a resolved program.
    #[tracing::instrument(skip(self))]
    pub fn parse(mut self) -> Result<Program, ParseError> {
        while let Some(token) = self.tokens.get(self.position) {
            match &token.kind {
                TokenKind::Mnemonic(mnemonic) => {
                    let (mnemonic, line) = (*mnemonic, token.line);
                    self.parse_instruction(mnemonic, line)?;
                }
                TokenKind::Label => self.parse_label_definition()?,
                TokenKind::Global => self.parse_global()?,
                _ => self.position += 1,
            }
        }
        self.resolve()
    }
}
