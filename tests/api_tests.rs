use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Command;

use sbc::ast::StatementKind;
use sbc::context::ParserContext;
use sbc::dump::{render_token, render_tree};
use sbc::encode::{LineTokens, ProgramImage, crunch};
use sbc::error::ErrorKind;
use sbc::keyword::Keyword;
use sbc::lexer::{Lexer, TokenKind};
use sbc::limits::PoolLimits;

fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn numbered(count: u16, body: &str) -> String {
    (1..=count).map(|n| format!("{} {}\n", n * 10, body)).collect()
}

#[test]
fn test_tokens_of_a_program() {
    let image = crunch("10 PRINT \"HI\";&1F\n20 GOTO 10\n").unwrap();
    let mut lexer = Lexer::new(Cursor::new(image), &PoolLimits::default());

    let mut lines = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        lines.push(render_token(&token, lexer.token_text()));
        if token.kind == TokenKind::Eof {
            break;
        }
    }

    assert_eq!(
        lines,
        vec![
            "LINE 10",
            "KEYWORD PRINT",
            "STRING \"HI\"",
            "OPERATOR ;",
            "HEX &1F",
            "LINE 20",
            "KEYWORD GOTO",
            "LINENUMBER 10",
            "EOF",
        ]
    );
}

#[test]
fn test_hand_built_image() {
    let mut image = ProgramImage::new();
    image
        .push_line(100, &LineTokens::new().keyword(Keyword::GOSUB).line_ref(200))
        .unwrap();
    image
        .push_line(200, &LineTokens::new().keyword(Keyword::END))
        .unwrap();

    let mut ctx = ParserContext::default();
    ctx.parse_reader(Cursor::new(image.finish())).unwrap();
    assert_eq!(render_tree(&ctx), "  100 GOSUB 200\n  200 END\n");
}

#[test]
fn test_statement_pool_limit() {
    let source = numbered(300, "END");

    let mut ctx = ParserContext::new(PoolLimits::small());
    let err = ctx.parse_reader(Cursor::new(crunch(&source).unwrap())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProgramTooBig);
    assert_eq!(err.line(), Some(2560));

    let mut ctx = ParserContext::new(PoolLimits::large());
    let root = ctx.parse_reader(Cursor::new(crunch(&source).unwrap())).unwrap();
    assert_eq!(ctx.body(root).count(), 300);
}

#[test]
fn test_string_pool_limit() {
    let mut limits = PoolLimits::small();
    limits.string_pool_bytes = 16;

    let mut ctx = ParserContext::new(limits);
    let err = ctx
        .parse_reader(Cursor::new(crunch("10 A$=\"ABCDEFGH\"\n20 B$=\"IJKLMNOP\"\n").unwrap()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooManyStrings);
    assert_eq!(err.line(), Some(20));
}

#[test]
fn test_bad_number_reports_line() {
    let mut ctx = ParserContext::default();
    let err = ctx
        .parse_reader(Cursor::new(crunch("10 A=1\n20 A=&123456789\n").unwrap()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadNumber);
    assert_eq!(err.line(), Some(20));
}

#[test]
fn test_truncated_image() {
    // Cut inside the first line header
    let mut image = crunch("10 PRINT 1\n").unwrap();
    image.truncate(3);

    let mut ctx = ParserContext::default();
    let err = ctx.parse_reader(Cursor::new(image)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadProgram);
}

#[test]
fn test_long_program_through_small_buffer() {
    let source = numbered(200, "PRINT \"THE QUICK BROWN FOX\";X*2");

    let mut limits = PoolLimits::large();
    limits.lex_buffer_size = 260;
    let mut ctx = ParserContext::new(limits);
    let root = ctx.parse_reader(Cursor::new(crunch(&source).unwrap())).unwrap();

    let kinds: Vec<StatementKind> = ctx.body(root).map(|(_, s)| s.kind).collect();
    assert_eq!(kinds.len(), 200);
    assert!(kinds.iter().all(|&k| k == StatementKind::Print));
}

#[test]
fn test_cli_tokens() {
    let path = temp_file("sbc_cli_tokens.bbc", &crunch("10 END\n").unwrap());
    let output = Command::new(env!("CARGO_BIN_EXE_sbc"))
        .arg("tokens")
        .arg(&path)
        .output()
        .unwrap();
    let _ = fs::remove_file(&path);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "LINE 10\nKEYWORD END\nEOF\n"
    );
}

#[test]
fn test_cli_parse_usage() {
    let path = temp_file("sbc_cli_usage.bbc", &crunch("10 X=1\n").unwrap());
    let output = Command::new(env!("CARGO_BIN_EXE_sbc"))
        .args(["parse", "--size", "small", "--usage"])
        .arg(&path)
        .output()
        .unwrap();
    let _ = fs::remove_file(&path);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("   10 ASSIGN X = 1\n"));
    assert!(stdout.contains("statements: 1/255"));
}

#[test]
fn test_cli_config_limits() {
    let program = temp_file(
        "sbc_cli_config.bbc",
        &crunch("10 WHILE A\n20 WHILE B\n30 ENDWHILE\n40 ENDWHILE\n").unwrap(),
    );
    let config = temp_file("sbc_cli_config.toml", b"[limits]\nsize = \"small\"\nmax_nesting = 2\n");

    let output = Command::new(env!("CARGO_BIN_EXE_sbc"))
        .arg("parse")
        .arg("--config")
        .arg(&config)
        .arg(&program)
        .output()
        .unwrap();
    let _ = fs::remove_file(&program);
    let _ = fs::remove_file(&config);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Too many nested levels at line 20"));
}

#[test]
fn test_cli_invalid_limits() {
    let program = temp_file("sbc_cli_invalid.bbc", &crunch("10 END\n").unwrap());
    let config = temp_file("sbc_cli_invalid.toml", b"[limits]\nmax_statements = 0\n");

    let output = Command::new(env!("CARGO_BIN_EXE_sbc"))
        .arg("parse")
        .arg("--config")
        .arg(&config)
        .arg(&program)
        .output()
        .unwrap();
    let _ = fs::remove_file(&program);
    let _ = fs::remove_file(&config);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_statements"));
}

#[test]
fn test_cli_missing_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_sbc"))
        .args(["parse", "/nonexistent/prog.bbc"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open file"));
}
