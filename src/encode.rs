// Tokenized program images
//
// Writes the binary format the lexer reads. `crunch` turns BASIC text into
// an image; `ProgramImage` and `LineTokens` assemble one token by token.

use crate::error::{ErrorKind, SbcError};
use crate::keyword::Keyword;
use crate::lexer::{CR, END_MARKER, LINE_NUMBER_MARKER};

const LINE_HEADER: usize = 4;
const MAX_LINE_LEN: usize = u8::MAX as usize;

/// Highest line number; a high byte of 0xFF would read as the end marker
pub const MAX_LINE_NUMBER: u16 = 0xFEFF;

/// Encode a line number reference such as a GOTO target
pub fn encode_line_number(line: u16) -> [u8; 4] {
    let [lo, hi] = line.to_le_bytes();
    let b1 = (((lo & 0xC0) >> 2) | ((hi & 0xC0) >> 4)) ^ 0x54;
    let b2 = (lo & 0x3F) | 0x40;
    let b3 = (hi & 0x3F) | 0x40;
    [LINE_NUMBER_MARKER, b1, b2, b3]
}

/// Token bytes of one line, without the line header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTokens {
    bytes: Vec<u8>,
}

impl LineTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: Keyword) -> Self {
        keyword.encode(&mut self.bytes);
        self
    }

    /// Raw text: identifiers, numbers, operators and strings
    pub fn text(mut self, text: &str) -> Self {
        self.bytes.extend_from_slice(text.as_bytes());
        self
    }

    pub fn line_ref(mut self, line: u16) -> Self {
        self.bytes.extend_from_slice(&encode_line_number(line));
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A program image under construction
#[derive(Debug, Clone, Default)]
pub struct ProgramImage {
    bytes: Vec<u8>,
}

impl ProgramImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, number: u16, tokens: &LineTokens) -> Result<(), ErrorKind> {
        if number > MAX_LINE_NUMBER {
            return Err(ErrorKind::BadLabel);
        }

        let len = tokens.as_bytes().len() + LINE_HEADER;
        if len > MAX_LINE_LEN {
            return Err(ErrorKind::BadProgram);
        }

        let [hi, lo] = number.to_be_bytes();
        self.bytes.extend_from_slice(&[CR, hi, lo, len as u8]);
        self.bytes.extend_from_slice(tokens.as_bytes());
        Ok(())
    }

    /// Append the end marker and return the image
    pub fn finish(mut self) -> Vec<u8> {
        self.bytes.extend_from_slice(&[CR, END_MARKER]);
        self.bytes
    }
}

/// Build an image from numbered lines of BASIC text
///
/// Keywords must be upper case. Blank text lines are skipped.
pub fn crunch(text: &str) -> Result<Vec<u8>, SbcError> {
    let mut image = ProgramImage::new();
    let mut last_line = 0;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let digits = line.bytes().take_while(u8::is_ascii_digit).count();
        let number: u16 = line[..digits]
            .parse()
            .map_err(|_| ErrorKind::BadLabel.at(last_line))?;

        let body = &line[digits..];
        let body = body.strip_prefix(' ').unwrap_or(body);
        image
            .push_line(number, &crunch_line(body.as_bytes()))
            .map_err(|k| k.at(number))?;
        last_line = number;
    }

    Ok(image.finish())
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'%')
}

/// Longest keyword name at the start of `text`
///
/// A name must end the word unless it ends in `(` or `$`. FN and PROC run
/// straight into the name that follows them.
fn match_keyword(text: &[u8]) -> Option<(Keyword, usize)> {
    let mut best: Option<(Keyword, usize)> = None;

    for keyword in (0..Keyword::MAX).filter_map(Keyword::from_code) {
        let name = keyword.name().as_bytes();
        if name.is_empty() || !text.starts_with(name) {
            continue;
        }

        let glued = matches!(keyword, Keyword::FN | Keyword::PROC);
        let ends_word = name.last().is_some_and(|c| !c.is_ascii_alphanumeric())
            || text.get(name.len()).is_none_or(|&c| !is_ident_byte(c));
        if !glued && !ends_word {
            continue;
        }

        // Ties keep the lowest code, which is the expression form
        if best.is_none_or(|(_, len)| name.len() > len) {
            best = Some((keyword, name.len()));
        }
    }

    best
}

fn crunch_line(body: &[u8]) -> LineTokens {
    let mut out = Vec::with_capacity(body.len());
    let mut line_refs = false; // After GOTO, GOSUB, THEN or ELSE
    let mut i = 0;

    while i < body.len() {
        let b = body[i];

        if b == b'"' {
            let end = body[i + 1..]
                .iter()
                .position(|&c| c == b'"')
                .map_or(body.len(), |p| i + p + 2);
            out.extend_from_slice(&body[i..end]);
            line_refs = false;
            i = end;
            continue;
        }

        if b == b'&' {
            let end = i + 1 + body[i + 1..].iter().take_while(|c| c.is_ascii_hexdigit()).count();
            out.extend_from_slice(&body[i..end]);
            line_refs = false;
            i = end;
            continue;
        }

        if b.is_ascii_digit() && line_refs {
            let end = i + body[i..].iter().take_while(|c| c.is_ascii_digit()).count();
            let target = std::str::from_utf8(&body[i..end])
                .ok()
                .and_then(|s| s.parse::<u16>().ok());
            match target {
                Some(line) => out.extend_from_slice(&encode_line_number(line)),
                None => out.extend_from_slice(&body[i..end]),
            }
            i = end;
            continue;
        }

        if b.is_ascii_uppercase() {
            if let Some((keyword, len)) = match_keyword(&body[i..]) {
                keyword.encode(&mut out);
                i += len;
                if keyword == Keyword::REM {
                    out.extend_from_slice(&body[i..]);
                    break;
                }
                line_refs = matches!(
                    keyword,
                    Keyword::GOTO | Keyword::GOSUB | Keyword::THEN | Keyword::ELSE
                );
                continue;
            }
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            i += 1;
            while i < body.len() && (body[i].is_ascii_alphanumeric() || body[i] == b'_') {
                i += 1;
            }
            if i < body.len() && matches!(body[i], b'$' | b'%') {
                i += 1;
            }
            out.extend_from_slice(&body[start..i]);
            line_refs = false;
            continue;
        }

        out.push(b);
        if !matches!(b, b' ' | b',') {
            line_refs = false;
        }
        i += 1;
    }

    LineTokens::new().bytes(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::decode_line_number;

    #[test]
    fn test_line_number_encoding() {
        assert_eq!(encode_line_number(1000), [0x8D, 0x64, 0x68, 0x43]);

        for line in [0, 10, 255, 256, 1000, 32767, MAX_LINE_NUMBER] {
            let [_, b1, b2, b3] = encode_line_number(line);
            assert_eq!(decode_line_number(b1, b2, b3), line);
        }
    }

    #[test]
    fn test_line_builder() {
        let mut image = ProgramImage::new();
        let line = LineTokens::new().keyword(Keyword::PRINT).text("1");
        image.push_line(10, &line).unwrap();
        assert_eq!(image.finish(), vec![0x0D, 0, 10, 6, 0xF1, b'1', 0x0D, 0xFF]);
    }

    #[test]
    fn test_line_too_long() {
        let mut image = ProgramImage::new();
        let long = LineTokens::new().text(&"A".repeat(252));
        assert_eq!(image.push_line(10, &long), Err(ErrorKind::BadProgram));

        let fits = LineTokens::new().text(&"A".repeat(251));
        assert!(image.push_line(10, &fits).is_ok());
    }

    #[test]
    fn test_line_number_range() {
        let mut image = ProgramImage::new();
        assert_eq!(
            image.push_line(0xFF00, &LineTokens::new()),
            Err(ErrorKind::BadLabel)
        );
    }

    #[test]
    fn test_crunch_keywords() {
        let image = crunch("10 PRINT X\n20 END").unwrap();
        assert_eq!(image, vec![
            0x0D, 0, 10, 7, 0xF1, b' ', b'X',
            0x0D, 0, 20, 5, 0xE0,
            0x0D, 0xFF,
        ]);
    }

    #[test]
    fn test_crunch_word_boundaries() {
        // TOTAL is an identifier, TO is not matched inside it
        let line = crunch_line(b"TOTAL=1");
        assert_eq!(line.as_bytes(), b"TOTAL=1");

        // Longest match wins
        let line = crunch_line(b"ENDPROC");
        let mut expected = Vec::new();
        Keyword::ENDPROC.encode(&mut expected);
        assert_eq!(line.as_bytes(), expected.as_slice());

        // FN runs into its name
        let line = crunch_line(b"FNsq(2)");
        assert_eq!(line.as_bytes(), &[0xA4, b's', b'q', b'(', b'2', b')']);
    }

    #[test]
    fn test_crunch_extended_keywords() {
        let line = crunch_line(b"WHILE X");
        assert_eq!(line.as_bytes(), &[0xC8, 0x95, b' ', b'X']);
    }

    #[test]
    fn test_crunch_strings_and_hex_are_raw() {
        let line = crunch_line(b"PRINT \"END\";&DEF");
        assert_eq!(line.as_bytes(), b"\xF1 \"END\";&DEF");
    }

    #[test]
    fn test_crunch_line_references() {
        let line = crunch_line(b"GOTO 1000");
        assert_eq!(line.as_bytes(), &[0xE5, b' ', 0x8D, 0x64, 0x68, 0x43]);

        // Only directly after the keyword
        let line = crunch_line(b"X=10");
        assert_eq!(line.as_bytes(), b"X=10");
    }

    #[test]
    fn test_crunch_rem_is_raw() {
        let line = crunch_line(b"REM PRINT this");
        assert_eq!(line.as_bytes(), b"\xF4 PRINT this");
    }

    #[test]
    fn test_crunch_bad_label() {
        let err = crunch("10 END\nPRINT\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadLabel);
        assert_eq!(err.line(), Some(10));
    }
}
