use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::error::{ErrorKind, SbcError};
use crate::expression::{IdKind, Real5};
use crate::keyword::{Keyword, SINGLE_BYTE_BASE};
use crate::limits::PoolLimits;

pub const CR: u8 = 0x0D;
pub const END_MARKER: u8 = 0xFF;
pub const LINE_NUMBER_MARKER: u8 = 0x8D;

// CR, line number (2 bytes), length
const LINE_HEADER: usize = 4;

bitflags! {
    /// Character classes used while scanning the program text
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharClass: u8 {
        const SPACE = 1 << 0;
        const DIGIT = 1 << 1;
        const HEX = 1 << 2;
        const IDENT_START = 1 << 3;
        const IDENT = 1 << 4;
        const SIMPLE_OP = 1 << 5;
        const COMPLEX_OP = 1 << 6;
    }
}

impl CharClass {
    pub fn of(b: u8) -> Self {
        match b {
            b' ' | b'\t' => CharClass::SPACE,
            b'0'..=b'9' => CharClass::DIGIT | CharClass::HEX | CharClass::IDENT,
            b'A'..=b'F' | b'a'..=b'f' => {
                CharClass::HEX | CharClass::IDENT_START | CharClass::IDENT
            }
            b'G'..=b'Z' | b'g'..=b'z' | b'_' => CharClass::IDENT_START | CharClass::IDENT,
            b'/' | b'*' | b'(' | b')' | b'=' | b',' | b';' | b'^' | b'~' | b'?' | b'$'
            | b'!' | b':' | b'\'' => CharClass::SIMPLE_OP,
            b'<' | b'>' | b'+' | b'-' => CharClass::COMPLEX_OP,
            _ => CharClass::empty(),
        }
    }
}

// Token types

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Slash,        // /
    Star,         // *
    OpenBracket,  // (
    CloseBracket, // )
    Equals,       // =
    Comma,        // ,
    Semicolon,    // ;
    Caret,        // ^
    Tilde,        // ~
    Query,        // ?
    Dollar,       // $
    Pling,        // !
    Colon,        // :
    Quote,        // '
    Plus,         // +
    Minus,        // -
    Lt,           // <
    Gt,           // >
    Lte,          // <=
    Gte,          // >=
    Neq,          // <>
    Lsl,          // <<
    Lsr,          // >>
    Asr,          // >>>
    PlusEq,       // +=
    MinusEq,      // -=
}

/// Map the text of an operator token to its operator
///
/// Multi-byte spans are classified by shape alone: any three byte span is
/// `>>>`, and a two byte span starting with `<` that is neither `<>` nor `<<`
/// is `<=`.
pub fn map_operator(span: &[u8]) -> Option<Operator> {
    let op = match span {
        [b'/'] => Operator::Slash,
        [b'*'] => Operator::Star,
        [b'('] => Operator::OpenBracket,
        [b')'] => Operator::CloseBracket,
        [b'='] => Operator::Equals,
        [b','] => Operator::Comma,
        [b';'] => Operator::Semicolon,
        [b'^'] => Operator::Caret,
        [b'~'] => Operator::Tilde,
        [b'?'] => Operator::Query,
        [b'$'] => Operator::Dollar,
        [b'!'] => Operator::Pling,
        [b':'] => Operator::Colon,
        [b'\''] => Operator::Quote,
        [b'+'] => Operator::Plus,
        [b'-'] => Operator::Minus,
        [b'<'] => Operator::Lt,
        [b'>'] => Operator::Gt,
        [_, _, _] => Operator::Asr,
        [b'<', b'>'] => Operator::Neq,
        [b'<', b'<'] => Operator::Lsl,
        [b'<', _] => Operator::Lte,
        [b'+', _] => Operator::PlusEq,
        [b'-', _] => Operator::MinusEq,
        [_, b'>'] => Operator::Lsr,
        [_, _] => Operator::Gte,
        _ => return None,
    };
    Some(op)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    LineLabel(u16),
    Keyword(Keyword),
    Operator(Operator),
    Str,
    Integer(i32),
    Hex(i32),
    Bin(i32),
    Real(Real5),
    Identifier(IdKind),
    LineNumber(u16), // Encoded reference such as a GOTO target
    Rem,
    Unknown,
}

/// Position of a token's text inside the lexer buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: u16,
    pub len: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    fn eof() -> Self {
        Self {
            kind: TokenKind::Eof,
            span: Span::default(),
        }
    }
}

/// Decode the three bytes following a line number marker
pub fn decode_line_number(b1: u8, b2: u8, b3: u8) -> u16 {
    let mut a = b1 << 2;
    let lo = b2 ^ (a & 0xC0);
    a <<= 2;
    let hi = b3 ^ a;
    u16::from_le_bytes([lo, hi])
}

// Lexer

/// Pull lexer over a tokenized program
///
/// Works through a fixed window over the reader. At every line start the
/// rest of the line and the first bytes of the next one are made resident,
/// so tokens inside a line never straddle a refill.
pub struct Lexer<R> {
    reader: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,      // Reader returned 0 bytes
    finished: bool, // End of program marker consumed
    line_no: u16,
    token: Token,
}

impl Lexer<File> {
    pub fn open<P: AsRef<Path>>(path: P, limits: &PoolLimits) -> Result<Self, SbcError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SbcError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "opened program");
        Ok(Self::new(file, limits))
    }
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R, limits: &PoolLimits) -> Self {
        Self {
            reader,
            buf: vec![0; limits.lex_buffer_size],
            start: 0,
            end: 0,
            eof: false,
            finished: false,
            line_no: 0,
            token: Token::eof(),
        }
    }

    /// The most recently lexed token
    pub fn token(&self) -> Token {
        self.token
    }

    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    /// Bytes of the current token. Only valid until the next advance.
    pub fn token_text(&self) -> &[u8] {
        let start = self.token.span.start as usize;
        let end = (start + self.token.span.len as usize).min(self.buf.len());
        &self.buf[start.min(end)..end]
    }

    /// Line number of the line being lexed
    pub fn line_no(&self) -> u16 {
        self.line_no
    }

    fn fail(&self, kind: ErrorKind) -> SbcError {
        kind.at(self.line_no)
    }

    // Bytes past the resident data read as CR so scans stop there
    fn byte(&self, i: usize) -> u8 {
        if i < self.end { self.buf[i] } else { CR }
    }

    fn span(&self, start: usize, len: usize) -> Result<Span, SbcError> {
        let len = u8::try_from(len).map_err(|_| self.fail(ErrorKind::BadProgram))?;
        Ok(Span {
            start: start as u16,
            len,
        })
    }

    /// Make sure `wanted` bytes from the cursor are resident
    fn ensure(&mut self, wanted: usize) -> Result<(), SbcError> {
        if self.end - self.start >= wanted {
            return Ok(());
        }

        if self.eof {
            return Err(self.fail(ErrorKind::BadProgram));
        }

        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }

        while self.end < self.buf.len() {
            match self.reader.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => self.end += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(SbcError::Read {
                        line: self.line_no,
                        source,
                    });
                }
            }
        }

        if self.end - self.start < wanted {
            return Err(self.fail(ErrorKind::BadProgram));
        }
        Ok(())
    }

    // Main tokenization method

    pub fn next_token(&mut self) -> Result<Token, SbcError> {
        if self.finished {
            self.token = Token::eof();
            return Ok(self.token);
        }

        loop {
            self.ensure(1)?;
            if !CharClass::of(self.buf[self.start]).contains(CharClass::SPACE) {
                break;
            }
            self.start += 1;
        }

        let first = self.buf[self.start];
        let class = CharClass::of(first);

        let token = match first {
            CR => self.lex_line_start()?,
            LINE_NUMBER_MARKER => self.lex_line_number()?,
            b if Keyword::is_extended_lead(b) => self.lex_extended_keyword()?,
            b'&' => self.lex_hex()?,
            b'%' => self.lex_binary()?,
            b'"' => self.lex_string()?,
            b'.' => self.lex_number(self.start, self.start, false)?,
            _ if class.contains(CharClass::DIGIT) => {
                self.lex_number(self.start, self.start, false)?
            }
            _ if class.contains(CharClass::IDENT_START) => self.lex_identifier()?,
            _ if class.contains(CharClass::SIMPLE_OP) => self.lex_operator(1)?,
            _ if class.contains(CharClass::COMPLEX_OP) => self.lex_complex_operator()?,
            b if b >= SINGLE_BYTE_BASE => self.lex_keyword()?,
            _ => {
                let span = self.span(self.start, 1)?;
                self.start += 1;
                Token {
                    kind: TokenKind::Unknown,
                    span,
                }
            }
        };

        self.token = token;
        Ok(token)
    }

    // Line handling

    fn lex_line_start(&mut self) -> Result<Token, SbcError> {
        self.start += 1;
        self.ensure(1)?;

        if self.buf[self.start] == END_MARKER {
            self.start += 1;
            self.finished = true;
            debug!(last_line = self.line_no, "end of program");
            return Ok(Token::eof());
        }

        self.ensure(3)?;
        let line_no = u16::from_be_bytes([self.buf[self.start], self.buf[self.start + 1]]);
        let len = self.buf[self.start + 2] as usize;
        self.line_no = line_no;

        if len < LINE_HEADER {
            return Err(self.fail(ErrorKind::BadProgram));
        }

        let span = self.span(self.start, 2)?;
        self.start += 2;

        // Length byte, the line body, then CR and one byte of the next line
        self.ensure(len - 1)?;
        self.start += 1;

        trace!(line = line_no, len, "line");
        Ok(Token {
            kind: TokenKind::LineLabel(line_no),
            span,
        })
    }

    fn lex_line_number(&mut self) -> Result<Token, SbcError> {
        self.ensure(4)?;
        let s = self.start;
        let line = decode_line_number(self.buf[s + 1], self.buf[s + 2], self.buf[s + 3]);
        let span = self.span(s, 4)?;
        self.start += 4;
        Ok(Token {
            kind: TokenKind::LineNumber(line),
            span,
        })
    }

    // Keywords

    fn lex_keyword(&mut self) -> Result<Token, SbcError> {
        let first = self.buf[self.start];
        let keyword = Keyword::from_code(first - SINGLE_BYTE_BASE)
            .ok_or_else(|| self.fail(ErrorKind::BadProgram))?;
        let span = self.span(self.start, 1)?;
        self.start += 1;

        if keyword != Keyword::REM {
            return Ok(Token {
                kind: TokenKind::Keyword(keyword),
                span,
            });
        }

        // The comment runs to the end of the line
        let begin = self.start;
        while self.byte(self.start) != CR {
            self.start += 1;
        }
        Ok(Token {
            kind: TokenKind::Rem,
            span: self.span(begin, self.start - begin)?,
        })
    }

    fn lex_extended_keyword(&mut self) -> Result<Token, SbcError> {
        let lead = self.buf[self.start];
        let offset = self.byte(self.start + 1);
        let keyword =
            Keyword::from_extended(lead, offset).ok_or_else(|| self.fail(ErrorKind::BadProgram))?;
        let span = self.span(self.start, 2)?;
        self.start += 2;
        Ok(Token {
            kind: TokenKind::Keyword(keyword),
            span,
        })
    }

    // Identifiers and strings

    fn lex_identifier(&mut self) -> Result<Token, SbcError> {
        let begin = self.start;
        let mut i = begin + 1;
        while CharClass::of(self.byte(i)).contains(CharClass::IDENT) {
            i += 1;
        }

        let kind = match self.byte(i) {
            b'$' => {
                i += 1;
                IdKind::String
            }
            b'%' => {
                i += 1;
                IdKind::Integer
            }
            _ => IdKind::Real,
        };

        let span = self.span(begin, i - begin)?;
        self.start = i;
        Ok(Token {
            kind: TokenKind::Identifier(kind),
            span,
        })
    }

    fn lex_string(&mut self) -> Result<Token, SbcError> {
        let begin = self.start + 1;
        let mut i = begin;
        loop {
            match self.byte(i) {
                b'"' => break,
                CR => return Err(self.fail(ErrorKind::MissingQuote)),
                _ => i += 1,
            }
        }

        // Span excludes both quotes
        let span = self.span(begin, i - begin)?;
        self.start = i + 1;
        Ok(Token {
            kind: TokenKind::Str,
            span,
        })
    }

    // Number lexing

    fn lex_hex(&mut self) -> Result<Token, SbcError> {
        let begin = self.start;
        let mut i = begin + 1;
        let mut value: u32 = 0;
        let mut count = 0;

        while CharClass::of(self.byte(i)).contains(CharClass::HEX) {
            if count == 8 {
                return Err(self.fail(ErrorKind::BadNumber));
            }
            let digit = (self.byte(i) as char).to_digit(16).unwrap_or(0);
            value = (value << 4) | digit;
            count += 1;
            i += 1;
        }

        if count == 0 {
            return Err(self.fail(ErrorKind::BadNumber));
        }

        let span = self.span(begin, i - begin)?;
        self.start = i;
        Ok(Token {
            kind: TokenKind::Hex(value as i32),
            span,
        })
    }

    fn lex_binary(&mut self) -> Result<Token, SbcError> {
        let begin = self.start;
        let mut i = begin + 1;
        let mut value: u32 = 0;
        let mut count = 0;

        while matches!(self.byte(i), b'0' | b'1') {
            if count == 32 {
                return Err(self.fail(ErrorKind::BadNumber));
            }
            value = (value << 1) | u32::from(self.byte(i) - b'0');
            count += 1;
            i += 1;
        }

        if count == 0 {
            return Err(self.fail(ErrorKind::BadNumber));
        }

        let span = self.span(begin, i - begin)?;
        self.start = i;
        Ok(Token {
            kind: TokenKind::Bin(value as i32),
            span,
        })
    }

    fn is_digit(&self, i: usize) -> bool {
        CharClass::of(self.byte(i)).contains(CharClass::DIGIT)
    }

    /// Decimal integer, or a real when the digits run into `.` or `E`
    ///
    /// `token_start` is where the token text begins (a leading `-` for
    /// negative literals), `begin` is the first digit.
    fn lex_number(
        &mut self,
        token_start: usize,
        begin: usize,
        negative: bool,
    ) -> Result<Token, SbcError> {
        let mut i = begin;
        while self.is_digit(i) {
            i += 1;
        }

        if matches!(self.byte(i), b'.' | b'E') {
            return self.lex_real(token_start, begin, negative);
        }

        // Accumulate towards the sign so i32::MIN is reachable
        let mut value: i32 = 0;
        for &b in &self.buf[begin..i] {
            let digit = i32::from(b - b'0');
            value = value
                .checked_mul(10)
                .and_then(|v| {
                    if negative {
                        v.checked_sub(digit)
                    } else {
                        v.checked_add(digit)
                    }
                })
                .ok_or_else(|| self.fail(ErrorKind::BadNumber))?;
        }

        let span = self.span(token_start, i - token_start)?;
        self.start = i;
        Ok(Token {
            kind: TokenKind::Integer(value),
            span,
        })
    }

    fn lex_real(
        &mut self,
        token_start: usize,
        begin: usize,
        negative: bool,
    ) -> Result<Token, SbcError> {
        let mut i = begin;
        while self.is_digit(i) {
            i += 1;
        }
        if self.byte(i) == b'.' {
            i += 1;
            while self.is_digit(i) {
                i += 1;
            }
        }
        if matches!(self.byte(i), b'E' | b'e') {
            let mut j = i + 1;
            if matches!(self.byte(j), b'+' | b'-') {
                j += 1;
            }
            if self.is_digit(j) {
                while self.is_digit(j) {
                    j += 1;
                }
                i = j;
            }
        }

        let value: f32 = std::str::from_utf8(&self.buf[begin..i])
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| self.fail(ErrorKind::BadNumber))?;
        let value = if negative { -value } else { value };

        let span = self.span(token_start, i - token_start)?;
        self.start = i;
        Ok(Token {
            kind: TokenKind::Real(Real5::from_f32(value)),
            span,
        })
    }

    // Operators

    fn lex_operator(&mut self, len: usize) -> Result<Token, SbcError> {
        let span = self.span(self.start, len)?;
        let op = map_operator(&self.buf[self.start..self.start + len])
            .ok_or_else(|| self.fail(ErrorKind::BadProgram))?;
        self.start += len;
        Ok(Token {
            kind: TokenKind::Operator(op),
            span,
        })
    }

    fn lex_complex_operator(&mut self) -> Result<Token, SbcError> {
        let s = self.start;
        let first = self.buf[s];
        let second = self.byte(s + 1);

        let len = match (first, second) {
            (b'<', b'<' | b'>' | b'=') => 2,
            (b'>', b'>') if self.byte(s + 2) == b'>' => 3,
            (b'>', b'>' | b'=') => 2,
            (b'+', b'=') | (b'-', b'=') => 2,
            (b'-', _) => {
                // A minus running into a number is a negative literal
                let mut j = s + 1;
                while CharClass::of(self.byte(j)).contains(CharClass::SPACE) {
                    j += 1;
                }
                if self.is_digit(j) || self.byte(j) == b'.' {
                    return self.lex_number(s, j, true);
                }
                1
            }
            _ => 1,
        };

        self.lex_operator(len)
    }
}

// Tests
