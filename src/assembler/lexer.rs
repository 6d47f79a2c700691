use std::str::FromStr;

use crate::isa::{Mnemonic, Register};

mod token;

pub use token::{Token, TokenKind};

// Example code:
//
//   .global main
//   mov $10, rax
//   mov $3, rdi
//   .Lloop:
//   cmp $0, rdi
//   je .Ldone
//   sub $1, rdi
//   jmp .Lloop
//   .Ldone:
//   ret

// '$'  = literal number, e.g. `$12`
// '$_' = stack-relative operand, e.g. `$_8`
// '.L' = label, e.g. `.Lloop`
// '#'  = comment, e.g. `# this is a comment`

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LexError {
    #[error("'{lexeme}' is not a keyword or a register")]
    UnknownLexeme { lexeme: String, line: u32 },
    #[error("missing closing parentheses")]
    MissingClosingParen { line: u32 },
}

pub struct Lexer {
    /// Input characters
    chars: Vec<char>,
    /// Current position in the input (points to the current char)
    position: usize,
    /// Line number of the current char
    line: u32,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
            line: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn bump(&mut self) {
        self.position += 1;
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut lexeme = String::new();
        while let Some(ch) = self.current() {
            if !predicate(ch) {
                break;
            }
            lexeme.push(ch);
            self.bump();
        }
        lexeme
    }

    /// Mnemonic or register name
    fn read_word(&mut self) -> String {
        self.read_while(|ch| ch.is_ascii_alphanumeric())
    }

    /// Label or global name
    fn read_identifier(&mut self) -> String {
        self.read_while(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    }

    fn read_digits(&mut self) -> String {
        self.read_while(|ch| ch.is_ascii_digit())
    }

    fn skip_comment(&mut self) {
        while self.current().is_some() && self.current() != Some('\n') {
            self.bump();
        }
    }

    fn next_is_digit(&self) -> bool {
        matches!(self.peek(), Some(ch) if ch.is_ascii_digit())
    }

    fn lex_keyword_or_register(&mut self) -> Result<Token, LexError> {
        let lexeme = self.read_word();
        if let Ok(mnemonic) = Mnemonic::from_str(&lexeme) {
            return Ok(Token::new(TokenKind::Mnemonic(mnemonic), &lexeme, self.line));
        }
        if let Ok(register) = Register::from_str(&lexeme) {
            return Ok(Token::new(TokenKind::Register(register), &lexeme, self.line));
        }
        Err(LexError::UnknownLexeme {
            lexeme,
            line: self.line,
        })
    }

    /// `$<int>`, `$_<int>` or `$_<reg>`
    fn lex_immediate(&mut self) -> Token {
        self.bump(); // Consume the '$'
        if self.current() == Some('_') {
            self.bump();
            let offset = match self.current() {
                Some(ch) if ch.is_ascii_alphabetic() => self.read_word(),
                _ => self.read_digits(),
            };
            let lexeme = format!("_{}", offset);
            return Token::new(TokenKind::Address, &lexeme, self.line);
        }
        let mut lexeme = String::new();
        if self.current() == Some('-') {
            lexeme.push('-');
            self.bump();
        }
        lexeme.push_str(&self.read_digits());
        Token::new(TokenKind::Number, &lexeme, self.line)
    }

    /// A bare number, or a number with a `(<reg>)` suffix making it a
    /// base-plus-displacement memory operand. A leading `_` marks the
    /// displacement as relative to the base pointer frame.
    fn lex_number_or_displacement(&mut self) -> Result<Token, LexError> {
        let mut lexeme = String::new();
        let stack_marker = self.current() == Some('_');
        if let Some(marker @ ('_' | '-')) = self.current() {
            lexeme.push(marker);
            self.bump();
        }
        lexeme.push_str(&self.read_digits());

        if self.current() == Some('(') {
            self.bump();
            let register = self.read_identifier();
            if self.current() != Some(')') {
                return Err(LexError::MissingClosingParen { line: self.line });
            }
            self.bump();
            let lexeme = format!("{}({})", lexeme, register);
            return Ok(Token::new(TokenKind::RelativeAddress, &lexeme, self.line));
        }

        if stack_marker {
            Ok(Token::new(TokenKind::Address, &lexeme, self.line))
        } else {
            Ok(Token::new(TokenKind::Number, &lexeme, self.line))
        }
    }

    /// `(<reg>)` or `(<global>)`
    fn lex_location(&mut self) -> Result<Token, LexError> {
        self.bump(); // Consume the '('
        let name = self.read_identifier();
        if self.current() != Some(')') {
            return Err(LexError::MissingClosingParen { line: self.line });
        }
        self.bump();
        Ok(Token::new(TokenKind::LocationAt, &name, self.line))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let upcoming: String = self.chars[self.position..]
            .iter()
            .take(keyword.len())
            .collect();
        if upcoming == keyword {
            self.position += keyword.len();
            return true;
        }
        false
    }

    /// `.L<name>` labels and `.global<name>` declarations, with an optional
    /// space before the global's name
    fn lex_directive(&mut self) -> Result<Token, LexError> {
        self.bump(); // Consume the '.'
        if self.current() == Some('L') {
            let lexeme = format!(".{}", self.read_identifier());
            return Ok(Token::new(TokenKind::Label, &lexeme, self.line));
        }
        if self.eat_keyword("global") {
            while matches!(self.current(), Some(' ') | Some('\t')) {
                self.bump();
            }
            let lexeme = format!("g_{}", self.read_identifier());
            return Ok(Token::new(TokenKind::Global, &lexeme, self.line));
        }
        Err(LexError::UnknownLexeme {
            lexeme: format!(".{}", self.read_identifier()),
            line: self.line,
        })
    }

    /// Scan the whole input into tokens.
    ///
    /// Comments, whitespace and unrecognized characters produce no tokens;
    /// newlines only advance the line counter.
    #[tracing::instrument(skip(self))]
    pub fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.current() {
            match ch {
                ch if ch.is_ascii_alphabetic() => tokens.push(self.lex_keyword_or_register()?),
                '$' => tokens.push(self.lex_immediate()),
                ch if ch.is_ascii_digit() => tokens.push(self.lex_number_or_displacement()?),
                '-' | '_' if self.next_is_digit() => {
                    tokens.push(self.lex_number_or_displacement()?)
                }
                '(' => tokens.push(self.lex_location()?),
                '.' => tokens.push(self.lex_directive()?),
                ',' => {
                    tokens.push(Token::new(TokenKind::Comma, ",", self.line));
                    self.bump();
                }
                ':' => {
                    tokens.push(Token::new(TokenKind::Colon, ":", self.line));
                    self.bump();
                }
                '#' => self.skip_comment(),
                '\n' => {
                    self.line += 1;
                    self.bump();
                }
                _ => self.bump(),
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).lex().expect("lexing failed")
    }

    #[test]
    fn test_instruction() {
        let expected = vec![
            Token::new(TokenKind::Mnemonic(Mnemonic::Mov), "mov", 1),
            Token::new(TokenKind::Number, "5", 1),
            Token::new(TokenKind::Comma, ",", 1),
            Token::new(TokenKind::Register(Register::Rax), "rax", 1),
        ];
        assert_eq!(lex("mov $5, rax"), expected);
    }

    #[test]
    fn test_negative_immediate() {
        let expected = vec![
            Token::new(TokenKind::Mnemonic(Mnemonic::Push), "push", 1),
            Token::new(TokenKind::Number, "-42", 1),
        ];
        assert_eq!(lex("push $-42"), expected);
    }

    #[test]
    fn test_stack_relative_operand() {
        let expected = vec![
            Token::new(TokenKind::Mnemonic(Mnemonic::Mov), "mov", 1),
            Token::new(TokenKind::Address, "_8", 1),
            Token::new(TokenKind::Comma, ",", 1),
            Token::new(TokenKind::Register(Register::Rax), "rax", 1),
        ];
        assert_eq!(lex("mov $_8, rax"), expected);
    }

    #[test]
    fn test_register_offset_stack_slot() {
        let expected = vec![
            Token::new(TokenKind::Mnemonic(Mnemonic::Mov), "mov", 1),
            Token::new(TokenKind::Address, "_rcx", 1),
            Token::new(TokenKind::Comma, ",", 1),
            Token::new(TokenKind::Register(Register::Rax), "rax", 1),
        ];
        assert_eq!(lex("mov $_rcx, rax"), expected);
    }

    #[test]
    fn test_displacement_operands() {
        let tests = vec![
            ("-8(rbp)", "-8(rbp)"),
            ("16(rax)", "16(rax)"),
            ("_8(rbp)", "_8(rbp)"),
        ];
        for (input, expected) in tests {
            let tokens = lex(input);
            assert_eq!(
                tokens,
                vec![Token::new(TokenKind::RelativeAddress, expected, 1)]
            );
        }
    }

    #[test]
    fn test_location() {
        let expected = vec![
            Token::new(TokenKind::Mnemonic(Mnemonic::Movzb), "movzb", 1),
            Token::new(TokenKind::LocationAt, "rax", 1),
            Token::new(TokenKind::Comma, ",", 1),
            Token::new(TokenKind::Register(Register::Rdi), "rdi", 1),
        ];
        assert_eq!(lex("movzb (rax), rdi"), expected);
    }

    #[test]
    fn test_label_definition() {
        let expected = vec![
            Token::new(TokenKind::Label, ".Lloop", 1),
            Token::new(TokenKind::Colon, ":", 1),
        ];
        assert_eq!(lex(".Lloop:"), expected);
    }

    #[test]
    fn test_global() {
        // The name is namespaced with `g_`, with or without a separating space
        assert_eq!(
            lex(".global main"),
            vec![Token::new(TokenKind::Global, "g_main", 1)]
        );
        assert_eq!(
            lex(".globalmain"),
            vec![Token::new(TokenKind::Global, "g_main", 1)]
        );
    }

    #[test]
    fn test_line_numbers() {
        let input = "mov $1, rax\n# a comment line\ncmp $1, rax\n\nret";
        let tokens = lex(input);
        let lines: Vec<u32> = tokens.iter().map(|token| token.line).collect();
        assert_eq!(lines, vec![1, 1, 1, 1, 3, 3, 3, 3, 5]);
    }

    #[test]
    fn test_comment_produces_no_tokens() {
        assert_eq!(lex("# mov $1, rax"), vec![]);
    }

    #[test]
    fn test_unknown_lexeme() {
        let error = Lexer::new("mov $1, foo").lex().unwrap_err();
        assert_eq!(
            error,
            LexError::UnknownLexeme {
                lexeme: "foo".to_string(),
                line: 1
            }
        );
        assert_eq!(error.to_string(), "'foo' is not a keyword or a register");
    }

    #[test]
    fn test_missing_closing_paren() {
        let tests = vec!["mov (rax, rdi", "mov -8(rbp, rax"];
        for input in tests {
            let error = Lexer::new(input).lex().unwrap_err();
            assert_eq!(error, LexError::MissingClosingParen { line: 1 });
            assert_eq!(error.to_string(), "missing closing parentheses");
        }
    }
}
