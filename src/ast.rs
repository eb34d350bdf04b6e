use crate::error::ErrorKind;
use crate::expression::{ExprId, IdKind, NodeId};
use crate::string_storage::StringId;

// Statement tree stored in a single pool. Each statement is threaded into its
// parent's body through `next`; compound statements hold the head of their
// body list.

/// Handle of a statement record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(u16);

impl StmtId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Assign, // Also used for LET
    Blank,
    Rem,

    // Compound statements
    Case,
    When,
    Otherwise,
    For,
    ForStep,
    While,
    If,   // Single line IF without THEN
    Then, // IF with THEN
    Else,
    ElseThen, // ELSE of a multi-line IF ... THEN block
    DefProc,
    DefFn,

    // Closers
    EndCase,
    Next,
    EndWhile,
    EndIf,
    EndProc,
    EndFn, // `= expr` inside DEF FN

    // Simple commands
    Proc,
    Gcol,
    Goto,
    Gosub,
    End,
    On,
    Off,
    Mode,
    Move,
    Draw,
    Origin,
    Plot,
    Point,
    Rect,
    RectFill,
    Vdu,

    // PRINT and its items
    Print,
    PrintSpace,
    PrintComma,
    PrintSemicolon,
    PrintQuote,
    Tab,
    Spc,
}

impl StatementKind {
    pub fn name(self) -> &'static str {
        match self {
            StatementKind::Assign => "ASSIGN",
            StatementKind::Blank => "BLANK",
            StatementKind::Rem => "REM",
            StatementKind::Case => "CASE",
            StatementKind::When => "WHEN",
            StatementKind::Otherwise => "OTHERWISE",
            StatementKind::For => "FOR",
            StatementKind::ForStep => "FOR STEP",
            StatementKind::While => "WHILE",
            StatementKind::If => "IF",
            StatementKind::Then => "IF THEN",
            StatementKind::Else => "ELSE",
            StatementKind::ElseThen => "ELSE THEN",
            StatementKind::DefProc => "DEF PROC",
            StatementKind::DefFn => "DEF FN",
            StatementKind::EndCase => "ENDCASE",
            StatementKind::Next => "NEXT",
            StatementKind::EndWhile => "ENDWHILE",
            StatementKind::EndIf => "ENDIF",
            StatementKind::EndProc => "ENDPROC",
            StatementKind::EndFn => "=",
            StatementKind::Proc => "PROC",
            StatementKind::Gcol => "GCOL",
            StatementKind::Goto => "GOTO",
            StatementKind::Gosub => "GOSUB",
            StatementKind::End => "END",
            StatementKind::On => "ON",
            StatementKind::Off => "OFF",
            StatementKind::Mode => "MODE",
            StatementKind::Move => "MOVE",
            StatementKind::Draw => "DRAW",
            StatementKind::Origin => "ORIGIN",
            StatementKind::Plot => "PLOT",
            StatementKind::Point => "POINT",
            StatementKind::Rect => "RECT",
            StatementKind::RectFill => "RECT FILL",
            StatementKind::Vdu => "VDU",
            StatementKind::Print => "PRINT",
            StatementKind::PrintSpace => "ITEM",
            StatementKind::PrintComma => ",",
            StatementKind::PrintSemicolon => ";",
            StatementKind::PrintQuote => "'",
            StatementKind::Tab => "TAB",
            StatementKind::Spc => "SPC",
        }
    }

}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,    // =
    AddAssign, // +=
    SubAssign, // -=
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
        }
    }
}

/// What a compound statement is controlled by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Head {
    None,
    Expr(ExprId),
    List(Option<NodeId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementData {
    Empty,
    Assignment {
        target: StringId, // Variable name
        kind: IdKind,
        op: AssignOp,
        value: ExprId,
    },
    Compound {
        id: Option<StringId>, // Loop variable, CASE selector or DEF name
        head: Head,
        body: Option<StmtId>,
    },
    Exprs([Option<ExprId>; 4]),
    List(Option<NodeId>),
    Expr(Option<ExprId>),
    LineNumber(u16),
    Text(Option<StringId>), // REM text, NEXT variable
    Call {
        name: StringId,
        args: Option<NodeId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub data: StatementData,
    pub next: Option<StmtId>,
    pub line_no: u16,
}

impl Statement {
    /// First statement of a compound body
    pub fn body(&self) -> Option<StmtId> {
        match self.data {
            StatementData::Compound { body, .. } => body,
            _ => None,
        }
    }

    pub fn set_body(&mut self, stmt: StmtId) {
        if let StatementData::Compound { body, .. } = &mut self.data {
            *body = Some(stmt);
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatementPool {
    stmts: Vec<Statement>,
    max: usize,
}

impl StatementPool {
    pub fn new(max: usize) -> Self {
        Self {
            stmts: Vec::with_capacity(max),
            max,
        }
    }

    pub fn add(
        &mut self,
        kind: StatementKind,
        data: StatementData,
        line_no: u16,
    ) -> Result<StmtId, ErrorKind> {
        if self.stmts.len() >= self.max {
            return Err(ErrorKind::ProgramTooBig);
        }

        let id = StmtId(self.stmts.len() as u16);
        self.stmts.push(Statement {
            kind,
            data,
            next: None,
            line_no,
        });
        Ok(id)
    }

    pub fn get(&self, id: StmtId) -> Option<&Statement> {
        self.stmts.get(id.index())
    }

    pub fn get_mut(&mut self, id: StmtId) -> Option<&mut Statement> {
        self.stmts.get_mut(id.index())
    }

    /// Walk a body list through the `next` links
    pub fn siblings(&self, head: Option<StmtId>) -> Siblings<'_> {
        Siblings {
            pool: self,
            next: head,
        }
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn reset(&mut self) {
        self.stmts.clear();
    }
}

pub struct Siblings<'a> {
    pool: &'a StatementPool,
    next: Option<StmtId>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = (StmtId, &'a Statement);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let stmt = self.pool.get(id)?;
        self.next = stmt.next;
        Some((id, stmt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compound() -> StatementData {
        StatementData::Compound {
            id: None,
            head: Head::None,
            body: None,
        }
    }

    #[test]
    fn test_pool_capacity() {
        let mut pool = StatementPool::new(2);
        pool.add(StatementKind::End, StatementData::Empty, 10).unwrap();
        pool.add(StatementKind::End, StatementData::Empty, 20).unwrap();
        assert_eq!(
            pool.add(StatementKind::End, StatementData::Empty, 30),
            Err(ErrorKind::ProgramTooBig)
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_body_and_siblings() {
        let mut pool = StatementPool::new(8);
        let outer = pool.add(StatementKind::While, compound(), 10).unwrap();
        let a = pool.add(StatementKind::On, StatementData::Empty, 20).unwrap();
        let b = pool.add(StatementKind::Off, StatementData::Empty, 30).unwrap();

        pool.get_mut(outer).unwrap().set_body(a);
        pool.get_mut(a).unwrap().next = Some(b);

        let body = pool.get(outer).unwrap().body();
        let kinds: Vec<StatementKind> = pool.siblings(body).map(|(_, s)| s.kind).collect();
        assert_eq!(kinds, vec![StatementKind::On, StatementKind::Off]);
    }

    #[test]
    fn test_set_body_ignores_simple_statements() {
        let mut pool = StatementPool::new(4);
        let end = pool.add(StatementKind::End, StatementData::Empty, 10).unwrap();
        let other = pool.add(StatementKind::End, StatementData::Empty, 10).unwrap();
        pool.get_mut(end).unwrap().set_body(other);
        assert_eq!(pool.get(end).unwrap().body(), None);
    }

    #[test]
    fn test_reset() {
        let mut pool = StatementPool::new(4);
        pool.add(StatementKind::Blank, StatementData::Empty, 10).unwrap();
        pool.reset();
        assert!(pool.is_empty());
        let id = pool.add(StatementKind::Blank, StatementData::Empty, 10).unwrap();
        assert_eq!(id.index(), 0);
    }
}
