// Keyword codes of the tokenized program format
//
// Codes 0..=128 are stored as a single byte (code + 127). Codes from CASE
// upwards use a two byte form: a lead byte selecting the range followed by
// an offset byte starting at 0x8E.

/// Lead byte and base code of each extended range
const EXTENDED: [(u8, u8); 3] = [
    (0xC8, Keyword::CASE.0),
    (0xC7, Keyword::APPEND.0),
    (0xC6, Keyword::SUM.0),
];

pub const EXTENDED_OFFSET: u8 = 0x8E;
pub const SINGLE_BYTE_BASE: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keyword(u8);

impl Keyword {
    pub const OTHERWISE: Keyword = Keyword(0);
    pub const AND: Keyword = Keyword(1);
    pub const DIV: Keyword = Keyword(2);
    pub const EOR: Keyword = Keyword(3);
    pub const MOD: Keyword = Keyword(4);
    pub const OR: Keyword = Keyword(5);
    pub const OFF: Keyword = Keyword(8);
    pub const STEP: Keyword = Keyword(9);
    pub const SPC: Keyword = Keyword(10);
    pub const TAB: Keyword = Keyword(11);
    pub const ELSE: Keyword = Keyword(12);
    pub const THEN: Keyword = Keyword(13);
    pub const TIME: Keyword = Keyword(18);
    pub const COS: Keyword = Keyword(28);
    pub const FN: Keyword = Keyword(37);
    pub const GET: Keyword = Keyword(38);
    pub const PI: Keyword = Keyword(48);
    pub const RAD: Keyword = Keyword(51);
    pub const RND: Keyword = Keyword(52);
    pub const SIN: Keyword = Keyword(54);
    pub const SQR: Keyword = Keyword(55);
    pub const TO: Keyword = Keyword(57);
    pub const CHR_STR: Keyword = Keyword(62);
    pub const WHEN: Keyword = Keyword(74);
    pub const OF: Keyword = Keyword(75);
    pub const ENDCASE: Keyword = Keyword(76);
    pub const ENDIF: Keyword = Keyword(78);
    pub const ENDWHILE: Keyword = Keyword(79);
    pub const DEF: Keyword = Keyword(94);
    pub const DRAW: Keyword = Keyword(96);
    pub const END: Keyword = Keyword(97);
    pub const ENDPROC: Keyword = Keyword(98);
    pub const FOR: Keyword = Keyword(100);
    pub const GOSUB: Keyword = Keyword(101);
    pub const GOTO: Keyword = Keyword(102);
    pub const GCOL: Keyword = Keyword(103);
    pub const IF: Keyword = Keyword(104);
    pub const LET: Keyword = Keyword(106);
    pub const MODE: Keyword = Keyword(108);
    pub const MOVE: Keyword = Keyword(109);
    pub const NEXT: Keyword = Keyword(110);
    pub const ON: Keyword = Keyword(111);
    pub const VDU: Keyword = Keyword(112);
    pub const PLOT: Keyword = Keyword(113);
    pub const PRINT: Keyword = Keyword(114);
    pub const PROC: Keyword = Keyword(115);
    pub const REM: Keyword = Keyword(117);
    pub const OSCLI: Keyword = Keyword(128);
    pub const CASE: Keyword = Keyword(129);
    pub const FILL: Keyword = Keyword(131);
    pub const ORIGIN: Keyword = Keyword(132);
    pub const POINT: Keyword = Keyword(133);
    pub const RECT: Keyword = Keyword(134);
    pub const WHILE: Keyword = Keyword(136);
    pub const APPEND: Keyword = Keyword(151);
    pub const SUM: Keyword = Keyword(169);
    pub const BEAT: Keyword = Keyword(170);

    /// One past the last valid code
    pub const MAX: u8 = 171;

    pub fn from_code(code: u8) -> Option<Self> {
        (code < Self::MAX).then_some(Keyword(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// Decode the code carried by an extended keyword
    pub fn from_extended(lead: u8, offset: u8) -> Option<Self> {
        if offset < EXTENDED_OFFSET {
            return None;
        }
        let (_, base) = EXTENDED.iter().find(|(l, _)| *l == lead)?;
        Self::from_code(base.checked_add(offset - EXTENDED_OFFSET)?)
    }

    pub fn is_extended_lead(byte: u8) -> bool {
        EXTENDED.iter().any(|(l, _)| *l == byte)
    }

    pub fn name(self) -> &'static str {
        NAMES[self.0 as usize]
    }

    /// Append the tokenized form of this keyword
    pub fn encode(self, out: &mut Vec<u8>) {
        if self.0 < Self::CASE.0 {
            out.push(self.0 + SINGLE_BYTE_BASE);
            return;
        }
        for &(lead, base) in EXTENDED.iter().rev() {
            if self.0 >= base {
                out.push(lead);
                out.push(EXTENDED_OFFSET + (self.0 - base));
                return;
            }
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// Unused codes (the line number marker and the extended lead bytes) are empty
const NAMES: [&str; Keyword::MAX as usize] = [
    "OTHERWISE", "AND", "DIV", "EOR", "MOD", "OR", "ERROR", "LINE", "OFF", "STEP",
    "SPC", "TAB(", "ELSE", "THEN", "", "OPENIN", "PTR", "PAGE", "TIME", "LOMEM",
    "HIMEM", "ABS", "ACS", "ADVAL", "ASC", "ASN", "ATN", "BGET", "COS", "COUNT",
    "DEG", "ERL", "ERR", "EVAL", "EXP", "EXT", "FALSE", "FN", "GET", "INKEY",
    "INSTR(", "INT", "LEN", "LN", "LOG", "NOT", "OPENUP", "OPENOUT", "PI", "POINT(",
    "POS", "RAD", "RND", "SGN", "SIN", "SQR", "TAN", "TO", "TRUE", "USR",
    "VAL", "VPOS", "CHR$", "GET$", "INKEY$", "LEFT$(", "MID$(", "RIGHT$(", "STR$", "STRING$(",
    "EOF", "", "", "", "WHEN", "OF", "ENDCASE", "ELSE", "ENDIF", "ENDWHILE",
    "PTR", "PAGE", "TIME", "LOMEM", "HIMEM", "SOUND", "BPUT", "CALL", "CHAIN", "CLEAR",
    "CLOSE", "CLG", "CLS", "DATA", "DEF", "DIM", "DRAW", "END", "ENDPROC", "ENVELOPE",
    "FOR", "GOSUB", "GOTO", "GCOL", "IF", "INPUT", "LET", "LOCAL", "MODE", "MOVE",
    "NEXT", "ON", "VDU", "PLOT", "PRINT", "PROC", "READ", "REM", "REPEAT", "REPORT",
    "RESTORE", "RETURN", "RUN", "STOP", "COLOUR", "TRACE", "UNTIL", "WIDTH", "OSCLI", "CASE",
    "CIRCLE", "FILL", "ORIGIN", "POINT", "RECTANGLE", "SWAP", "WHILE", "WAIT", "MOUSE", "QUIT",
    "SYS", "INSTALL", "LIBRARY", "TINT", "ELLIPSE", "BEATS", "TEMPO", "VOICES", "VOICE", "STEREO",
    "OVERLAY", "APPEND", "AUTO", "CRUNCH", "DELETE", "EDIT", "HELP", "LIST", "LOAD", "LVAR",
    "NEW", "OLD", "RENUMBER", "SAVE", "TEXTLOAD", "TEXTSAVE", "TWIN", "TWINNO", "INSTALL", "SUM",
    "BEAT",
];
