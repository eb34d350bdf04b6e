//! Error registry shared by the lexer, the pools and the statement builder.
//!
//! Codes below [`ERROR_BASE`] belong to the assembler tooling that shares the
//! same numeric space, so every code here lives in the reserved range
//! starting at 26.

use std::io;
use std::path::PathBuf;

/// First code of the reserved sub-range. Codes below it are owned by the
/// assembler.
pub const ERROR_BASE: u8 = 26;

/// Every failure the front end can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    BadProgram = ERROR_BASE,
    BadNumber,
    MissingQuote,
    Open,
    Write,
    Read,
    TooManyStrings,
    TooManyExpressions,
    BadLabel,
    ProgramTooBig,
    KeywordExpected,
    IdentifierExpected,
    EqualsExpected,
    ExpressionExpected,
    TooMuchNesting,
    EndwhileUnexpected,
    LineNumberExpected,
    CommaExpected,
    ToExpected,
    NextUnexpected,
    CloseBracketExpected,
    EndcaseExpected,
    OfExpected,
    ProcOrFnExpected,
    EndprocUnexpected,
    ElseOrEndifUnexpected,
    EqualsUnexpected,
    SyntaxError,
}

// Indexed by `code - ERROR_BASE`; keep in declaration order.
const MESSAGES: [&str; 28] = [
    "Bad program",
    "Bad number",
    "Missing \"",
    "Failed to open file",
    "Failed to write to file",
    "Failed to read from file",
    "Too many constant strings",
    "Too many expressions",
    "Bad line number",
    "Program too big",
    "Keyword expected",
    "Identifier expected",
    "= expected",
    "Expression expected",
    "Too many nested levels",
    "ENDWHILE unexpected",
    "Line number expected",
    ", expected",
    "TO expected",
    "NEXT unexpected",
    ") expected",
    "ENDCASE expected",
    "OF expected",
    "PROC or FN expected",
    "ENDPROC unexpected",
    "ELSE or ENDIF unexpected",
    "= unexpected",
    "Syntax error",
];

const ALL: [ErrorKind; 28] = [
    ErrorKind::BadProgram,
    ErrorKind::BadNumber,
    ErrorKind::MissingQuote,
    ErrorKind::Open,
    ErrorKind::Write,
    ErrorKind::Read,
    ErrorKind::TooManyStrings,
    ErrorKind::TooManyExpressions,
    ErrorKind::BadLabel,
    ErrorKind::ProgramTooBig,
    ErrorKind::KeywordExpected,
    ErrorKind::IdentifierExpected,
    ErrorKind::EqualsExpected,
    ErrorKind::ExpressionExpected,
    ErrorKind::TooMuchNesting,
    ErrorKind::EndwhileUnexpected,
    ErrorKind::LineNumberExpected,
    ErrorKind::CommaExpected,
    ErrorKind::ToExpected,
    ErrorKind::NextUnexpected,
    ErrorKind::CloseBracketExpected,
    ErrorKind::EndcaseExpected,
    ErrorKind::OfExpected,
    ErrorKind::ProcOrFnExpected,
    ErrorKind::EndprocUnexpected,
    ErrorKind::ElseOrEndifUnexpected,
    ErrorKind::EqualsUnexpected,
    ErrorKind::SyntaxError,
];

/// One past the last code in the reserved range.
pub const ERROR_MAX: u8 = ERROR_BASE + ALL.len() as u8;

impl ErrorKind {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        if (ERROR_BASE..ERROR_MAX).contains(&code) {
            Some(ALL[(code - ERROR_BASE) as usize])
        } else {
            None
        }
    }

    pub fn message(self) -> &'static str {
        MESSAGES[(self.code() - ERROR_BASE) as usize]
    }

    /// Attach the line the failure was detected on.
    pub fn at(self, line: u16) -> SbcError {
        SbcError::At { kind: self, line }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Look up the message for a raw code, as the formatter and the assembler do.
pub fn error_message(code: u8) -> &'static str {
    match ErrorKind::from_code(code) {
        Some(kind) => kind.message(),
        None => "Unknown error",
    }
}

/// Error returned by every fallible front-end operation.
#[derive(Debug, thiserror::Error)]
pub enum SbcError {
    #[error("{} : {}", ErrorKind::Open.message(), .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} at line {line}", ErrorKind::Read.message())]
    Read {
        line: u16,
        #[source]
        source: io::Error,
    },
    #[error("{} at line {line}", .kind.message())]
    At { kind: ErrorKind, line: u16 },
}

impl SbcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SbcError::Open { .. } => ErrorKind::Open,
            SbcError::Read { .. } => ErrorKind::Read,
            SbcError::At { kind, .. } => *kind,
        }
    }

    /// Source line the error refers to, if any.
    pub fn line(&self) -> Option<u16> {
        match self {
            SbcError::Open { .. } => None,
            SbcError::Read { line, .. } | SbcError::At { line, .. } => Some(*line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_start_after_assembler_range() {
        assert_eq!(ErrorKind::BadProgram.code(), 26);
        assert_eq!(ErrorKind::BadNumber.code(), 27);
        assert_eq!(ErrorKind::SyntaxError.code(), ERROR_MAX - 1);
    }

    #[test]
    fn test_table_matches_declaration_order() {
        for (i, kind) in ALL.iter().enumerate() {
            assert_eq!(kind.code(), ERROR_BASE + i as u8);
            assert_eq!(ErrorKind::from_code(kind.code()), Some(*kind));
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(error_message(ErrorKind::BadNumber.code()), "Bad number");
        assert_eq!(error_message(ErrorKind::NextUnexpected.code()), "NEXT unexpected");
        assert_eq!(error_message(ErrorKind::MissingQuote.code()), "Missing \"");
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(error_message(0), "Unknown error");
        assert_eq!(error_message(ERROR_BASE - 1), "Unknown error");
        assert_eq!(error_message(ERROR_MAX), "Unknown error");
        assert_eq!(error_message(255), "Unknown error");
    }

    #[test]
    fn test_display() {
        let err = ErrorKind::TooMuchNesting.at(120);
        assert_eq!(err.to_string(), "Too many nested levels at line 120");
        assert_eq!(err.kind(), ErrorKind::TooMuchNesting);
        assert_eq!(err.line(), Some(120));

        let err = SbcError::Open {
            path: PathBuf::from("prog.bbc"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "Failed to open file : prog.bbc");
        assert_eq!(err.line(), None);
    }
}
