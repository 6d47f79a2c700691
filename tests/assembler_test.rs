use pretty_assertions::assert_eq;

use mockx64::assembler::{assemble, lexer::Lexer, parser::Parser, AssemblerError};

#[test]
fn test_assembles_demo_programs() {
    let sources = vec![
        include_str!("../demos/sum.asm"),
        include_str!("../demos/call.asm"),
        include_str!("../demos/greeting.asm"),
        include_str!("../demos/locals.asm"),
    ];
    for source in sources {
        assert!(assemble(source).is_ok());
    }
}

#[test]
fn test_reparsing_tokens_yields_equal_programs() {
    let source = include_str!("../demos/sum.asm");
    let tokens = Lexer::new(source).lex().unwrap();

    let first = Parser::new(&tokens).parse().unwrap();
    let second = Parser::new(&tokens).parse().unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_jump_to_undefined_label_is_a_resolution_error() {
    let source = "mov $1, rax\njmp .Lend\nret";
    let error = assemble(source).unwrap_err();
    assert!(matches!(error, AssemblerError::Parse(_)));
    assert_eq!(
        error.to_string(),
        "Parser error: cannot jump to unknown label '.Lend'"
    );
}

#[test]
fn test_call_to_undefined_label_is_a_resolution_error() {
    let error = assemble("call .Lmissing\nret").unwrap_err();
    assert!(matches!(error, AssemblerError::Parse(_)));
}

#[test]
fn test_unknown_word_is_a_lexical_error() {
    let error = assemble("bogus $1, rax").unwrap_err();
    assert!(matches!(error, AssemblerError::Lex(_)));
    assert_eq!(
        error.to_string(),
        "Lexer error: 'bogus' is not a keyword or a register"
    );
}
