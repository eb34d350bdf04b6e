// Parser module - splits parser into logical components
mod expressions;
mod helpers;
mod list;
mod statements;
mod tree;

use std::io::Read;

use crate::ast::StmtId;
use crate::context::ParserContext;
use crate::error::{ErrorKind, SbcError};
use crate::lexer::{Lexer, TokenKind};

use tree::Frame;

// Parser structure
pub struct Parser<'c, R> {
    lexer: Lexer<R>,
    ctx: &'c mut ParserContext,
    frames: Vec<Frame>, // frames[0] is the program itself
    root: Option<StmtId>,
    line_no: u16, // Line being parsed, reported in errors
}

impl<'c, R: Read> Parser<'c, R> {
    pub fn new(lexer: Lexer<R>, ctx: &'c mut ParserContext) -> Self {
        let mut frames = Vec::with_capacity(ctx.limits().max_nesting);
        frames.push(Frame::root());

        Self {
            lexer,
            ctx,
            frames,
            root: None,
            line_no: 0,
        }
    }

    // Main parsing entry point
    pub fn parse(mut self) -> Result<Option<StmtId>, SbcError> {
        self.advance()?;

        loop {
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::LineLabel(line_no) => self.parse_line(line_no)?,
                _ => return Err(self.fail(ErrorKind::BadLabel)),
            }
        }

        Ok(self.root)
    }
}

// Public API function
pub fn parse<R: Read>(
    lexer: Lexer<R>,
    ctx: &mut ParserContext,
) -> Result<Option<StmtId>, SbcError> {
    Parser::new(lexer, ctx).parse()
}
