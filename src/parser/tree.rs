use std::io::Read;

use tracing::trace;

use super::Parser;
use crate::ast::{Statement, StatementData, StatementKind, StmtId};
use crate::error::{ErrorKind, SbcError};

/// How a parsed statement affects the nesting stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Shape {
    Simple,
    Open,
    Close,
    Else, // Closes IF or THEN and opens its own block
}

/// An open compound statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Frame {
    pub kind: Option<StatementKind>, // None for the program itself
    pub compound: Option<StmtId>,
    pub tail: Option<StmtId>, // Last statement appended to the body
    pub line_no: u16,
}

impl Frame {
    pub(super) fn root() -> Self {
        Self {
            kind: None,
            compound: None,
            tail: None,
            line_no: 0,
        }
    }

    fn is(&self, kinds: &[StatementKind]) -> bool {
        self.kind.is_some_and(|k| kinds.contains(&k))
    }
}

/// Openers a closing statement pairs with, and the error when none is open
fn closer_target(kind: StatementKind) -> Option<(&'static [StatementKind], ErrorKind)> {
    let target: (&'static [StatementKind], ErrorKind) = match kind {
        StatementKind::Next => (
            &[StatementKind::For, StatementKind::ForStep],
            ErrorKind::NextUnexpected,
        ),
        StatementKind::EndWhile => (&[StatementKind::While], ErrorKind::EndwhileUnexpected),
        StatementKind::EndCase => (&[StatementKind::Case], ErrorKind::EndcaseExpected),
        StatementKind::EndProc => (&[StatementKind::DefProc], ErrorKind::EndprocUnexpected),
        StatementKind::EndIf => (
            &[StatementKind::Then, StatementKind::ElseThen],
            ErrorKind::ElseOrEndifUnexpected,
        ),
        StatementKind::EndFn => (&[StatementKind::DefFn], ErrorKind::EqualsUnexpected),
        _ => return None,
    };
    Some(target)
}

/// Blocks whose first statement may follow without a `:`
pub(super) fn continues_line(kind: StatementKind) -> bool {
    matches!(
        kind,
        StatementKind::If
            | StatementKind::Then
            | StatementKind::Else
            | StatementKind::ElseThen
            | StatementKind::Otherwise
            | StatementKind::DefFn
    )
}

// Tree building
impl<R: Read> Parser<'_, R> {
    pub(super) fn top(&self) -> Frame {
        self.frames.last().copied().unwrap_or_else(Frame::root)
    }

    fn statement(&self, id: StmtId) -> Result<Statement, SbcError> {
        self.ctx
            .stmts
            .get(id)
            .copied()
            .ok_or_else(|| self.fail(ErrorKind::BadProgram))
    }

    /// Link a statement at the end of the innermost open body
    fn append(&mut self, stmt: StmtId) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };

        match (frame.tail, frame.compound) {
            (Some(tail), _) => {
                if let Some(prev) = self.ctx.stmts.get_mut(tail) {
                    prev.next = Some(stmt);
                }
            }
            (None, Some(compound)) => {
                if let Some(parent) = self.ctx.stmts.get_mut(compound) {
                    parent.set_body(stmt);
                }
            }
            (None, None) => self.root = Some(stmt),
        }
        frame.tail = Some(stmt);
    }

    fn push_frame(&mut self, stmt: StmtId, kind: StatementKind, line_no: u16) -> Result<(), SbcError> {
        if self.frames.len() >= self.ctx.limits().max_nesting {
            return Err(self.fail(ErrorKind::TooMuchNesting));
        }

        self.frames.push(Frame {
            kind: Some(kind),
            compound: Some(stmt),
            tail: None,
            line_no,
        });
        trace!(depth = self.frames.len() - 1, kind = %kind, line = line_no, "open block");
        Ok(())
    }

    // The program frame is never popped
    fn pop_frame(&mut self) -> Option<Frame> {
        if self.frames.len() <= 1 {
            return None;
        }
        let frame = self.frames.pop()?;
        if let Some(kind) = frame.kind {
            trace!(depth = self.frames.len(), kind = %kind, "close block");
        }
        Some(frame)
    }

    /// Place a parsed statement in the tree
    pub(super) fn build_tree(&mut self, stmt: StmtId, shape: Shape) -> Result<(), SbcError> {
        let s = self.statement(stmt)?;

        match shape {
            Shape::Simple => self.append(stmt),
            Shape::Open => {
                self.append(stmt);
                self.push_frame(stmt, s.kind, s.line_no)?;
            }
            Shape::Close => {
                if self.close_matches(&s)? {
                    self.pop_frame();
                }
                self.append(stmt);
            }
            Shape::Else => self.open_else(stmt, s.line_no)?,
        }

        Ok(())
    }

    /// Check a closing statement against the open blocks
    ///
    /// Returns true when the innermost block is the one it closes, false when
    /// a matching block is only open further out.
    fn close_matches(&self, s: &Statement) -> Result<bool, SbcError> {
        let Some((openers, err)) = closer_target(s.kind) else {
            return Ok(false);
        };

        let top = self.top();
        if top.is(openers) {
            if let (StatementData::Text(Some(name)), Some(compound)) = (s.data, top.compound) {
                let open = self.statement(compound)?;
                let matches = matches!(
                    open.data,
                    StatementData::Compound { id: Some(id), .. } if id == name
                );
                if !matches {
                    return Err(self.fail(ErrorKind::NextUnexpected));
                }
            }
            return Ok(true);
        }

        if self.frames.iter().rev().skip(1).any(|f| f.is(openers)) {
            return Ok(false);
        }
        Err(self.fail(err))
    }

    /// ELSE ends the IF or THEN block it belongs to and opens its own
    fn open_else(&mut self, stmt: StmtId, line_no: u16) -> Result<(), SbcError> {
        let top = self.top();
        if !top.is(&[StatementKind::If, StatementKind::Then]) {
            return Err(self.fail(ErrorKind::ElseOrEndifUnexpected));
        }
        self.pop_frame();

        // A THEN opened on an earlier line is a block ended by ENDIF
        let kind = if top.kind == Some(StatementKind::Then) && top.line_no != line_no {
            StatementKind::ElseThen
        } else {
            StatementKind::Else
        };
        if let Some(s) = self.ctx.stmts.get_mut(stmt) {
            s.kind = kind;
        }

        self.append(stmt);
        self.push_frame(stmt, kind, line_no)
    }

    /// Close the blocks that end with their line
    ///
    /// WHEN, OTHERWISE, IF and ELSE always end here. A THEN block ends here
    /// when it was opened on this line and something followed the THEN.
    pub(super) fn close_line_blocks(&mut self, line_no: u16, last: Option<StmtId>) {
        loop {
            let top = self.top();
            let close = match top.kind {
                Some(
                    StatementKind::When
                    | StatementKind::Otherwise
                    | StatementKind::If
                    | StatementKind::Else,
                ) => true,
                Some(StatementKind::Then) => top.line_no == line_no && top.compound != last,
                _ => false,
            };
            if !close {
                break;
            }
            self.pop_frame();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::ParserContext;
    use crate::dump::render_tree;
    use crate::encode::crunch;
    use crate::error::ErrorKind;
    use crate::limits::PoolLimits;
    use std::io::Cursor;

    fn parse_with(source: &str, limits: PoolLimits) -> Result<String, (ErrorKind, Option<u16>)> {
        let image = crunch(source).unwrap();
        let mut ctx = ParserContext::new(limits);
        ctx.parse_reader(Cursor::new(image))
            .map_err(|e| (e.kind(), e.line()))?;
        Ok(render_tree(&ctx))
    }

    fn tree(source: &str) -> String {
        parse_with(source, PoolLimits::small()).unwrap()
    }

    fn error_kind(source: &str) -> ErrorKind {
        parse_with(source, PoolLimits::small()).unwrap_err().0
    }

    #[test]
    fn test_for_next_names() {
        assert_eq!(
            tree("10 FOR I=1 TO 3\n20 PRINT I\n30 NEXT I\n"),
            "   10 FOR I [1, 3]\n   20   PRINT\n   20     ITEM I\n   30 NEXT I\n"
        );
        assert!(parse_with("10 FOR I=1 TO 3\n20 NEXT\n", PoolLimits::small()).is_ok());
        assert_eq!(error_kind("10 FOR I=1 TO 3\n20 NEXT J\n"), ErrorKind::NextUnexpected);
    }

    #[test]
    fn test_unmatched_closers() {
        assert_eq!(error_kind("10 NEXT\n"), ErrorKind::NextUnexpected);
        assert_eq!(error_kind("10 ENDWHILE\n"), ErrorKind::EndwhileUnexpected);
        assert_eq!(error_kind("10 ENDCASE\n"), ErrorKind::EndcaseExpected);
        assert_eq!(error_kind("10 ENDPROC\n"), ErrorKind::EndprocUnexpected);
        assert_eq!(error_kind("10 ENDIF\n"), ErrorKind::ElseOrEndifUnexpected);
        assert_eq!(error_kind("10 ELSE\n"), ErrorKind::ElseOrEndifUnexpected);
        assert_eq!(error_kind("10 =1\n"), ErrorKind::EqualsUnexpected);
    }

    #[test]
    fn test_closer_for_outer_block_stays_inside() {
        assert_eq!(
            tree("10 FOR I=1 TO 2\n20 WHILE A\n30 NEXT\n40 ENDWHILE\n50 NEXT\n"),
            concat!(
                "   10 FOR I [1, 2]\n",
                "   20   WHILE A\n",
                "   30     NEXT\n",
                "   40   ENDWHILE\n",
                "   50 NEXT\n",
            )
        );
    }

    #[test]
    fn test_nesting_limit() {
        let mut limits = PoolLimits::small();
        limits.max_nesting = 3;

        let two_deep = "10 WHILE A\n20 WHILE B\n30 ENDWHILE\n40 ENDWHILE\n";
        assert!(parse_with(two_deep, limits.clone()).is_ok());

        let three_deep = "10 WHILE A\n20 WHILE B\n30 WHILE C\n";
        assert_eq!(
            parse_with(three_deep, limits),
            Err((ErrorKind::TooMuchNesting, Some(30)))
        );
    }

    #[test]
    fn test_case_blocks_close_with_their_line() {
        assert_eq!(
            tree("10 CASE X OF\n20 WHEN 1,2:Y=1\n30 OTHERWISE Y=2\n40 ENDCASE\n"),
            concat!(
                "   10 CASE X\n",
                "   20   WHEN [1, 2]\n",
                "   20     ASSIGN Y = 1\n",
                "   30   OTHERWISE\n",
                "   30     ASSIGN Y = 2\n",
                "   40 ENDCASE\n",
            )
        );
    }

    #[test]
    fn test_when_body_ends_at_line_end() {
        // The statement on the next line belongs to the CASE, not the WHEN
        assert_eq!(
            tree("10 CASE X OF\n20 WHEN 1\n30 Y=1\n40 ENDCASE\n"),
            "   10 CASE X\n   20   WHEN [1]\n   30   ASSIGN Y = 1\n   40 ENDCASE\n"
        );
    }

    #[test]
    fn test_single_line_if() {
        assert_eq!(
            tree("10 IF X THEN Y=1 ELSE Y=2\n20 END\n"),
            concat!(
                "   10 IF THEN X\n",
                "   10   ASSIGN Y = 1\n",
                "   10 ELSE\n",
                "   10   ASSIGN Y = 2\n",
                "   20 END\n",
            )
        );
        assert_eq!(
            tree("10 IF X Y=1\n20 END\n"),
            "   10 IF X\n   10   ASSIGN Y = 1\n   20 END\n"
        );
    }

    #[test]
    fn test_block_if() {
        assert_eq!(
            tree("10 IF X THEN\n20 Y=1\n30 ELSE\n40 Y=2\n50 ENDIF\n"),
            concat!(
                "   10 IF THEN X\n",
                "   20   ASSIGN Y = 1\n",
                "   30 ELSE THEN\n",
                "   40   ASSIGN Y = 2\n",
                "   50 ENDIF\n",
            )
        );
        assert!(parse_with("10 IF X THEN\n20 Y=1\n30 ENDIF\n", PoolLimits::small()).is_ok());
    }

    #[test]
    fn test_implicit_goto() {
        assert_eq!(
            tree("10 IF X THEN 100\n100 END\n"),
            "   10 IF THEN X\n   10   GOTO 100\n  100 END\n"
        );
        assert_eq!(
            tree("10 IF X THEN 100 ELSE 200\n100 END\n200 END\n"),
            concat!(
                "   10 IF THEN X\n",
                "   10   GOTO 100\n",
                "   10 ELSE\n",
                "   10   GOTO 200\n",
                "  100 END\n",
                "  200 END\n",
            )
        );
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            parse_with("10 A=1\n20 B=2\n30 NEXT\n", PoolLimits::small()),
            Err((ErrorKind::NextUnexpected, Some(30)))
        );
    }
}
