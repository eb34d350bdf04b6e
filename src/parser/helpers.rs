use std::io::Read;

use crate::ast::{StatementData, StatementKind, StmtId};
use crate::error::{ErrorKind, SbcError};
use crate::expression::{ExprId, Expression, NodeId};
use crate::keyword::Keyword;
use crate::lexer::{Operator, TokenKind};
use crate::string_storage::StringId;

// Parser helper methods
impl<R: Read> super::Parser<'_, R> {
    /// Error at the line being parsed
    ///
    /// The lexer may already be looking at the next line's label.
    pub(super) fn fail(&self, kind: ErrorKind) -> SbcError {
        kind.at(self.line_no)
    }

    /// Helper: Advance to the next token
    pub(super) fn advance(&mut self) -> Result<(), SbcError> {
        self.lexer.next_token()?;
        Ok(())
    }

    /// Helper: peek current token kind
    pub(super) fn kind(&self) -> TokenKind {
        self.lexer.kind()
    }

    pub(super) fn is_operator(&self, op: Operator) -> bool {
        self.kind() == TokenKind::Operator(op)
    }

    pub(super) fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind() == TokenKind::Keyword(keyword)
    }

    /// Helper: Consume a specific operator or fail with `err`
    pub(super) fn expect_operator(&mut self, op: Operator, err: ErrorKind) -> Result<(), SbcError> {
        if !self.is_operator(op) {
            return Err(self.fail(err));
        }
        self.advance()
    }

    /// Intern the text of the current token
    pub(super) fn intern_token(&mut self) -> Result<StringId, SbcError> {
        let text = self.lexer.token_text();
        self.ctx
            .strings
            .intern(text)
            .map_err(|k| k.at(self.line_no))
    }

    /// Intern the current token, which must be an identifier, and advance
    pub(super) fn expect_identifier(&mut self) -> Result<StringId, SbcError> {
        if !matches!(self.kind(), TokenKind::Identifier(_)) {
            return Err(self.fail(ErrorKind::IdentifierExpected));
        }
        let name = self.intern_token()?;
        self.advance()?;
        Ok(name)
    }

    pub(super) fn add_compound(&mut self, expr: Expression) -> Result<ExprId, SbcError> {
        self.ctx.exprs.add_compound(expr).map_err(|k| self.fail(k))
    }

    pub(super) fn add_node(&mut self, expr: ExprId) -> Result<NodeId, SbcError> {
        self.ctx.exprs.add_node(expr).map_err(|k| self.fail(k))
    }

    pub(super) fn add_statement(
        &mut self,
        kind: StatementKind,
        data: StatementData,
        line_no: u16,
    ) -> Result<StmtId, SbcError> {
        self.ctx
            .stmts
            .add(kind, data, line_no)
            .map_err(|k| self.fail(k))
    }
}
