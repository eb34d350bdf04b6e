use std::io::Read;

use tracing::trace;

use super::tree::{Shape, continues_line};
use super::Parser;
use crate::ast::{AssignOp, Head, StatementData, StatementKind, StmtId};
use crate::error::{ErrorKind, SbcError};
use crate::expression::{ExprId, Expression};
use crate::keyword::Keyword;
use crate::lexer::{Operator, TokenKind};
use crate::string_storage::StringId;

fn compound(id: Option<StringId>, head: Head) -> StatementData {
    StatementData::Compound {
        id,
        head,
        body: None,
    }
}

// Statement parsing methods
impl<R: Read> Parser<'_, R> {
    /// Parse the statements of one line; the current token is its label
    pub(super) fn parse_line(&mut self, line_no: u16) -> Result<(), SbcError> {
        trace!(line = line_no, depth = self.frames.len() - 1, "parse line");
        self.line_no = line_no;
        self.advance()?;

        let mut last = None;
        let mut needs_statement = true; // At line start and after a `:`
        let mut cont = false; // Previous statement opened a block that continues the line

        loop {
            if matches!(self.kind(), TokenKind::LineLabel(_) | TokenKind::Eof) {
                if needs_statement {
                    let blank = self.add_statement(StatementKind::Blank, StatementData::Empty, line_no)?;
                    self.build_tree(blank, Shape::Simple)?;
                    last = Some(blank);
                }
                break;
            }

            // A bare `:` is an empty statement
            if self.is_operator(Operator::Colon) && (needs_statement || cont) {
                let blank = self.add_statement(StatementKind::Blank, StatementData::Empty, line_no)?;
                self.build_tree(blank, Shape::Simple)?;
                last = Some(blank);
                self.advance()?;
                needs_statement = false;
                cont = false;
                continue;
            }

            let (stmt, shape) = self.parse_statement(line_no, cont)?;
            self.build_tree(stmt, shape)?;
            last = Some(stmt);
            needs_statement = false;

            cont = matches!(shape, Shape::Open | Shape::Else)
                && self.top().kind.is_some_and(continues_line);
            if cont || self.is_keyword(Keyword::ELSE) {
                continue;
            }

            if self.is_operator(Operator::Colon) {
                self.advance()?;
                needs_statement = true;
                continue;
            }
            break;
        }

        if !matches!(self.kind(), TokenKind::LineLabel(_) | TokenKind::Eof) {
            return Err(self.fail(ErrorKind::KeywordExpected));
        }

        self.close_line_blocks(line_no, last);
        Ok(())
    }

    /// Parse one statement starting at the current token
    ///
    /// `after_block` is set when the statement directly follows the opening
    /// of a block; after THEN or ELSE a line number is an implicit GOTO.
    fn parse_statement(&mut self, line_no: u16, after_block: bool) -> Result<(StmtId, Shape), SbcError> {
        match self.kind() {
            TokenKind::Identifier(_) => {
                let stmt = self.parse_assignment(line_no)?;
                Ok((stmt, Shape::Simple))
            }
            TokenKind::Keyword(keyword) => self.parse_keyword_statement(keyword, line_no),
            TokenKind::Rem => {
                let text = self.intern_token()?;
                self.advance()?;
                let stmt = self.add_statement(StatementKind::Rem, StatementData::Text(Some(text)), line_no)?;
                Ok((stmt, Shape::Simple))
            }
            TokenKind::Operator(Operator::Equals) => {
                let value = self.parse_next_expression()?;
                let stmt = self.add_statement(StatementKind::EndFn, StatementData::Expr(Some(value)), line_no)?;
                Ok((stmt, Shape::Close))
            }
            TokenKind::LineNumber(target)
                if after_block
                    && self.top().kind.is_some_and(|k| {
                        matches!(k, StatementKind::Then | StatementKind::Else | StatementKind::ElseThen)
                    }) =>
            {
                self.advance()?;
                let stmt = self.add_statement(StatementKind::Goto, StatementData::LineNumber(target), line_no)?;
                Ok((stmt, Shape::Simple))
            }
            _ => Err(self.fail(ErrorKind::KeywordExpected)),
        }
    }

    /// name = expr, name += expr or name -= expr
    fn parse_assignment(&mut self, line_no: u16) -> Result<StmtId, SbcError> {
        let TokenKind::Identifier(kind) = self.kind() else {
            return Err(self.fail(ErrorKind::IdentifierExpected));
        };
        let target = self.intern_token()?;
        self.advance()?;

        let op = match self.kind() {
            TokenKind::Operator(Operator::Equals) => AssignOp::Assign,
            TokenKind::Operator(Operator::PlusEq) => AssignOp::AddAssign,
            TokenKind::Operator(Operator::MinusEq) => AssignOp::SubAssign,
            _ => return Err(self.fail(ErrorKind::EqualsExpected)),
        };
        let value = self.parse_next_expression()?;

        self.add_statement(
            StatementKind::Assign,
            StatementData::Assignment {
                target,
                kind,
                op,
                value,
            },
            line_no,
        )
    }

    fn parse_keyword_statement(
        &mut self,
        keyword: Keyword,
        line_no: u16,
    ) -> Result<(StmtId, Shape), SbcError> {
        let (kind, data, shape) = match keyword {
            Keyword::LET => {
                self.advance()?;
                let stmt = self.parse_assignment(line_no)?;
                return Ok((stmt, Shape::Simple));
            }
            Keyword::PRINT => {
                let stmt = self.parse_print(line_no)?;
                return Ok((stmt, Shape::Simple));
            }

            // Blocks
            Keyword::FOR => return self.parse_for(line_no),
            Keyword::NEXT => {
                self.advance()?;
                let name = match self.kind() {
                    TokenKind::Identifier(_) => Some(self.expect_identifier()?),
                    _ => None,
                };
                (StatementKind::Next, StatementData::Text(name), Shape::Close)
            }
            Keyword::WHILE => {
                let cond = self.parse_next_expression()?;
                (StatementKind::While, compound(None, Head::Expr(cond)), Shape::Open)
            }
            Keyword::CASE => {
                self.advance()?;
                let selector = self.expect_identifier()?;
                if !self.is_keyword(Keyword::OF) {
                    return Err(self.fail(ErrorKind::OfExpected));
                }
                self.advance()?;
                (StatementKind::Case, compound(Some(selector), Head::None), Shape::Open)
            }
            Keyword::WHEN => {
                let values = self.parse_node_list()?;
                (StatementKind::When, compound(None, Head::List(Some(values))), Shape::Open)
            }
            Keyword::OTHERWISE => {
                self.advance()?;
                (StatementKind::Otherwise, compound(None, Head::None), Shape::Open)
            }
            Keyword::IF => {
                let cond = self.parse_next_expression()?;
                let kind = if self.is_keyword(Keyword::THEN) {
                    self.advance()?;
                    StatementKind::Then
                } else {
                    StatementKind::If
                };
                (kind, compound(None, Head::Expr(cond)), Shape::Open)
            }
            Keyword::ELSE => {
                self.advance()?;
                (StatementKind::Else, compound(None, Head::None), Shape::Else)
            }
            Keyword::DEF => return self.parse_def(line_no),
            Keyword::ENDWHILE | Keyword::ENDCASE | Keyword::ENDIF | Keyword::ENDPROC => {
                self.advance()?;
                let kind = match keyword {
                    Keyword::ENDWHILE => StatementKind::EndWhile,
                    Keyword::ENDCASE => StatementKind::EndCase,
                    Keyword::ENDIF => StatementKind::EndIf,
                    _ => StatementKind::EndProc,
                };
                (kind, StatementData::Empty, Shape::Close)
            }

            // Simple commands
            Keyword::PROC => {
                self.advance()?;
                if !matches!(self.kind(), TokenKind::Identifier(_)) {
                    return Err(self.fail(ErrorKind::IdentifierExpected));
                }
                let name = self.intern_token()?;
                let args = self.parse_bracketed_node_list()?;
                (StatementKind::Proc, StatementData::Call { name, args }, Shape::Simple)
            }
            Keyword::GOTO | Keyword::GOSUB => {
                self.advance()?;
                let TokenKind::LineNumber(target) = self.kind() else {
                    return Err(self.fail(ErrorKind::LineNumberExpected));
                };
                self.advance()?;
                let kind = if keyword == Keyword::GOTO {
                    StatementKind::Goto
                } else {
                    StatementKind::Gosub
                };
                (kind, StatementData::LineNumber(target), Shape::Simple)
            }
            Keyword::GCOL => {
                let mut exprs = [None; 4];
                exprs[0] = Some(self.parse_next_expression()?);
                if self.is_operator(Operator::Comma) {
                    exprs[1] = Some(self.parse_next_expression()?);
                }
                (StatementKind::Gcol, StatementData::Exprs(exprs), Shape::Simple)
            }
            Keyword::RECT => {
                self.advance()?;
                let kind = if self.is_keyword(Keyword::FILL) {
                    self.advance()?;
                    StatementKind::RectFill
                } else {
                    StatementKind::Rect
                };
                (kind, StatementData::Exprs(self.parse_exprs(4)?), Shape::Simple)
            }
            Keyword::MOVE | Keyword::DRAW | Keyword::ORIGIN | Keyword::POINT => {
                self.advance()?;
                let kind = match keyword {
                    Keyword::MOVE => StatementKind::Move,
                    Keyword::DRAW => StatementKind::Draw,
                    Keyword::ORIGIN => StatementKind::Origin,
                    _ => StatementKind::Point,
                };
                (kind, StatementData::Exprs(self.parse_exprs(2)?), Shape::Simple)
            }
            Keyword::PLOT => {
                self.advance()?;
                (StatementKind::Plot, StatementData::Exprs(self.parse_exprs(3)?), Shape::Simple)
            }
            Keyword::MODE => {
                let mode = self.parse_next_expression()?;
                (StatementKind::Mode, StatementData::Expr(Some(mode)), Shape::Simple)
            }
            Keyword::VDU => {
                let codes = self.parse_node_list()?;
                (StatementKind::Vdu, StatementData::List(Some(codes)), Shape::Simple)
            }
            Keyword::END | Keyword::ON | Keyword::OFF => {
                self.advance()?;
                let kind = match keyword {
                    Keyword::END => StatementKind::End,
                    Keyword::ON => StatementKind::On,
                    _ => StatementKind::Off,
                };
                (kind, StatementData::Empty, Shape::Simple)
            }
            _ => return Err(self.fail(ErrorKind::KeywordExpected)),
        };

        let stmt = self.add_statement(kind, data, line_no)?;
        Ok((stmt, shape))
    }

    /// FOR id = start TO end [STEP step]
    fn parse_for(&mut self, line_no: u16) -> Result<(StmtId, Shape), SbcError> {
        self.advance()?;
        let var = self.expect_identifier()?;
        if !self.is_operator(Operator::Equals) {
            return Err(self.fail(ErrorKind::EqualsExpected));
        }

        let start = self.parse_next_expression()?;
        if !self.is_keyword(Keyword::TO) {
            return Err(self.fail(ErrorKind::ToExpected));
        }
        let end = self.parse_next_expression()?;

        let head = self.add_node(start)?;
        let end_node = self.add_node(end)?;
        self.ctx.exprs.link(head, end_node);

        let mut kind = StatementKind::For;
        if self.is_keyword(Keyword::STEP) {
            let step = self.parse_next_expression()?;
            let step_node = self.add_node(step)?;
            self.ctx.exprs.link(end_node, step_node);
            kind = StatementKind::ForStep;
        }

        let stmt = self.add_statement(kind, compound(Some(var), Head::List(Some(head))), line_no)?;
        Ok((stmt, Shape::Open))
    }

    /// DEF PROCname(params) or DEF FNname(params)
    fn parse_def(&mut self, line_no: u16) -> Result<(StmtId, Shape), SbcError> {
        self.advance()?;
        let kind = match self.kind() {
            TokenKind::Keyword(Keyword::PROC) => StatementKind::DefProc,
            TokenKind::Keyword(Keyword::FN) => StatementKind::DefFn,
            _ => return Err(self.fail(ErrorKind::ProcOrFnExpected)),
        };

        self.advance()?;
        if !matches!(self.kind(), TokenKind::Identifier(_)) {
            return Err(self.fail(ErrorKind::IdentifierExpected));
        }
        let name = self.intern_token()?;
        let params = self.parse_bracketed_node_list()?;

        let all_identifiers = self
            .ctx
            .exprs
            .list(params)
            .all(|p| matches!(self.ctx.exprs.get(p), Some(Expression::Identifier { .. })));
        if !all_identifiers {
            return Err(self.fail(ErrorKind::IdentifierExpected));
        }

        let stmt = self.add_statement(kind, compound(Some(name), Head::List(params)), line_no)?;
        Ok((stmt, Shape::Open))
    }

    /// `count` comma separated expressions starting at the current token
    fn parse_exprs(&mut self, count: usize) -> Result<[Option<ExprId>; 4], SbcError> {
        let mut exprs = [None; 4];
        exprs[0] = Some(self.parse_expression()?);
        for slot in exprs.iter_mut().take(count).skip(1) {
            if !self.is_operator(Operator::Comma) {
                return Err(self.fail(ErrorKind::CommaExpected));
            }
            *slot = Some(self.parse_next_expression()?);
        }
        Ok(exprs)
    }

    // PRINT

    /// PRINT and its items
    ///
    /// The items are a chain of statements under the PRINT statement's body.
    /// A PRINT always ends with its line, so the chain is built here rather
    /// than through the nesting stack.
    fn parse_print(&mut self, line_no: u16) -> Result<StmtId, SbcError> {
        let print = self.add_statement(StatementKind::Print, compound(None, Head::None), line_no)?;
        self.advance()?;

        let mut tail: Option<StmtId> = None;
        while !self.at_print_end() {
            let item = self.parse_print_item(line_no)?;
            let prev = match tail {
                Some(t) => self.ctx.stmts.get_mut(t).map(|s| s.next = Some(item)),
                None => self.ctx.stmts.get_mut(print).map(|s| s.set_body(item)),
            };
            if prev.is_none() {
                return Err(self.fail(ErrorKind::BadProgram));
            }
            tail = Some(item);
        }

        Ok(print)
    }

    fn at_print_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::LineLabel(_)
                | TokenKind::Eof
                | TokenKind::Operator(Operator::Colon)
                | TokenKind::Keyword(Keyword::ELSE)
        )
    }

    /// Whether an expression follows a print separator
    fn print_expression_follows(&self) -> bool {
        !self.at_print_end()
            && !matches!(
                self.kind(),
                TokenKind::Operator(Operator::Semicolon | Operator::Comma | Operator::Quote)
                    | TokenKind::Keyword(Keyword::TAB | Keyword::SPC)
            )
    }

    fn parse_print_item(&mut self, line_no: u16) -> Result<StmtId, SbcError> {
        let (kind, data) = match self.kind() {
            TokenKind::Keyword(Keyword::TAB) => {
                let mut exprs = [None; 4];
                exprs[0] = Some(self.parse_next_expression()?);
                if self.is_operator(Operator::Comma) {
                    exprs[1] = Some(self.parse_next_expression()?);
                }
                self.expect_operator(Operator::CloseBracket, ErrorKind::CloseBracketExpected)?;
                (StatementKind::Tab, StatementData::Exprs(exprs))
            }
            TokenKind::Keyword(Keyword::SPC) => {
                let count = self.parse_next_expression()?;
                (StatementKind::Spc, StatementData::Expr(Some(count)))
            }
            TokenKind::Operator(sep @ (Operator::Semicolon | Operator::Comma | Operator::Quote)) => {
                let kind = match sep {
                    Operator::Semicolon => StatementKind::PrintSemicolon,
                    Operator::Comma => StatementKind::PrintComma,
                    _ => StatementKind::PrintQuote,
                };
                self.advance()?;
                let value = if self.print_expression_follows() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                (kind, StatementData::Expr(value))
            }
            _ => {
                let value = self.parse_expression()?;
                (StatementKind::PrintSpace, StatementData::Expr(Some(value)))
            }
        };

        self.add_statement(kind, data, line_no)
    }
}
