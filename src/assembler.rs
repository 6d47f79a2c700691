/// Lexes code into tokens.
///
/// Converts a string into tokens. For example, the string `mov $5, rax`
/// would be converted into the following tokens:
///
/// ```text
/// [
///     Token { kind: TokenKind::Mnemonic(Mnemonic::Mov), lexeme: "mov", line: 1 },
///     Token { kind: TokenKind::Number, lexeme: "5", line: 1 },
///     Token { kind: TokenKind::Comma, lexeme: ",", line: 1 },
///     Token { kind: TokenKind::Register(Register::Rax), lexeme: "rax", line: 1 },
/// ]
/// ```
pub mod lexer;

/// Parses tokens into resolved instructions.
pub mod parser;

#[derive(Debug, thiserror::Error)]
pub enum AssemblerError {
    #[error("Lexer error: {0}")]
    Lex(#[from] lexer::LexError),
    #[error("Parser error: {0}")]
    Parse(#[from] parser::ParseError),
}

/// Utility function for assembling a source program into resolved
/// instructions ready for execution.
#[tracing::instrument(skip(input))]
pub fn assemble(input: &str) -> Result<parser::Program, AssemblerError> {
    let tokens = lexer::Lexer::new(input).lex()?;
    let program = parser::Parser::new(&tokens).parse()?;

    Ok(program)
}
