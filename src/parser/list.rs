use std::io::Read;

use super::Parser;
use crate::error::{ErrorKind, SbcError};
use crate::expression::NodeId;
use crate::lexer::Operator;

// Expression lists
impl<R: Read> Parser<'_, R> {
    /// Parse a comma separated list of expressions, advancing first
    ///
    /// Returns the first node; the last node has no successor.
    pub(super) fn parse_node_list(&mut self) -> Result<NodeId, SbcError> {
        let first = self.parse_next_expression()?;
        let head = self.add_node(first)?;

        let mut tail = head;
        while self.is_operator(Operator::Comma) {
            let expr = self.parse_next_expression()?;
            let node = self.add_node(expr)?;
            self.ctx.exprs.link(tail, node);
            tail = node;
        }

        Ok(head)
    }

    /// Advance, then parse `( list )` if an opening bracket follows
    pub(super) fn parse_bracketed_node_list(&mut self) -> Result<Option<NodeId>, SbcError> {
        self.advance()?;
        if !self.is_operator(Operator::OpenBracket) {
            return Ok(None);
        }

        let head = self.parse_node_list()?;
        self.expect_operator(Operator::CloseBracket, ErrorKind::CloseBracketExpected)?;
        Ok(Some(head))
    }
}
