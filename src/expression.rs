// Expression pool
//
// Leaves (literals, identifiers and strings) are allocated from the low end
// of the slot array and deduplicated, so the same literal always has the
// same handle. Compound expressions are allocated from the high end and
// never shared. The two cursors meeting is the "too many expressions"
// condition.

use crate::error::ErrorKind;
use crate::string_storage::StringId;

/// Handle of an expression slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u16);

/// Handle of an expression-list node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u16);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Five byte real: exponent byte followed by a big-endian mantissa whose top
/// bit holds the sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Real5(pub [u8; 5]);

impl Real5 {
    /// Repack an IEEE single into the five byte layout
    ///
    /// The exponent bias is one higher than IEEE and the mantissa keeps only
    /// the 23 bits a single carries, so the last byte is always zero.
    pub fn from_f32(value: f32) -> Self {
        let bin = value.to_bits().to_le_bytes();
        let exponent = (bin[3] << 1)
            .wrapping_add(bin[2] >> 7)
            .wrapping_add(1);
        let mantissa_hi = (bin[2] & 0x7F) | (bin[3] & 0x80);
        Real5([exponent, mantissa_hi, bin[1], bin[0], 0])
    }

    pub fn to_f32(self) -> f32 {
        let [exponent, mantissa_hi, mid, lo, _] = self.0;
        let biased = exponent.wrapping_sub(1);
        let b3 = (mantissa_hi & 0x80) | (biased >> 1);
        let b2 = (mantissa_hi & 0x7F) | ((biased & 1) << 7);
        f32::from_bits(u32::from_le_bytes([lo, mid, b2, b3]))
    }

    pub fn is_negative(self) -> bool {
        self.0[1] & 0x80 != 0
    }
}

/// Type sigil of an identifier; string literals use `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    None,
    Integer,
    Real,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    Eor,
    And,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Lsl,
    Lsr,
    Asr,
    Add,
    Sub,
    Mul,
    RDiv,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "OR",
            BinaryOp::Eor => "EOR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::Lsl => "<<",
            BinaryOp::Lsr => ">>",
            BinaryOp::Asr => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::RDiv => "/",
            BinaryOp::Div => "DIV",
            BinaryOp::Mod => "MOD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Rnd,
    Rad,
    Sin,
    Cos,
    Sqr,
    ChrStr,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Rnd => "RND",
            UnaryOp::Rad => "RAD",
            UnaryOp::Sin => "SIN",
            UnaryOp::Cos => "COS",
            UnaryOp::Sqr => "SQR",
            UnaryOp::ChrStr => "CHR$",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullary {
    Get,
    Time,
    Pi,
}

impl Nullary {
    pub fn symbol(self) -> &'static str {
        match self {
            Nullary::Get => "GET",
            Nullary::Time => "TIME",
            Nullary::Pi => "PI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression {
    // Leaves
    Integer(i32),
    Hex(i32),
    Bin(i32),
    Real(Real5),
    Identifier { name: StringId, kind: IdKind },
    Str(StringId),

    // Compounds
    Binary { op: BinaryOp, lhs: ExprId, rhs: ExprId },
    Unary { op: UnaryOp, operand: ExprId },
    Nullary(Nullary),
    FnCall { name: StringId, args: Option<NodeId> },
}

impl Expression {
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expression::Integer(_)
                | Expression::Hex(_)
                | Expression::Bin(_)
                | Expression::Real(_)
                | Expression::Identifier { .. }
                | Expression::Str(_)
        )
    }
}

/// One link of an expression list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprNode {
    pub expr: ExprId,
    pub next: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ExpressionPool {
    slots: Vec<Option<Expression>>,
    low: usize,  // Next leaf slot
    high: usize, // Last compound slot handed out
    nodes: Vec<ExprNode>,
    max_nodes: usize,
}

impl ExpressionPool {
    pub fn new(max_expressions: usize, max_nodes: usize) -> Self {
        Self {
            slots: vec![None; max_expressions],
            low: 0,
            high: max_expressions,
            nodes: Vec::with_capacity(max_nodes),
            max_nodes,
        }
    }

    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.low = 0;
        self.high = self.slots.len();
        self.nodes.clear();
    }

    /// Add a leaf, returning the handle of an equal leaf if one exists
    fn add_leaf(&mut self, expr: Expression) -> Result<ExprId, ErrorKind> {
        if let Some(idx) = self.slots[..self.low]
            .iter()
            .position(|slot| *slot == Some(expr))
        {
            return Ok(ExprId(idx as u16));
        }

        if self.low == self.high {
            return Err(ErrorKind::TooManyExpressions);
        }

        let idx = self.low;
        self.slots[idx] = Some(expr);
        self.low += 1;
        Ok(ExprId(idx as u16))
    }

    /// Add a compound expression; these are never shared
    pub fn add_compound(&mut self, expr: Expression) -> Result<ExprId, ErrorKind> {
        if self.low == self.high {
            return Err(ErrorKind::TooManyExpressions);
        }

        self.high -= 1;
        self.slots[self.high] = Some(expr);
        Ok(ExprId(self.high as u16))
    }

    pub fn add_int(&mut self, value: i32) -> Result<ExprId, ErrorKind> {
        self.add_leaf(Expression::Integer(value))
    }

    pub fn add_hex(&mut self, value: i32) -> Result<ExprId, ErrorKind> {
        self.add_leaf(Expression::Hex(value))
    }

    pub fn add_bin(&mut self, value: i32) -> Result<ExprId, ErrorKind> {
        self.add_leaf(Expression::Bin(value))
    }

    pub fn add_real(&mut self, value: Real5) -> Result<ExprId, ErrorKind> {
        self.add_leaf(Expression::Real(value))
    }

    pub fn add_identifier(&mut self, name: StringId, kind: IdKind) -> Result<ExprId, ErrorKind> {
        self.add_leaf(Expression::Identifier { name, kind })
    }

    pub fn add_string(&mut self, text: StringId) -> Result<ExprId, ErrorKind> {
        self.add_leaf(Expression::Str(text))
    }

    pub fn get(&self, id: ExprId) -> Option<&Expression> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Allocate a list node with no successor
    pub fn add_node(&mut self, expr: ExprId) -> Result<NodeId, ErrorKind> {
        if self.nodes.len() >= self.max_nodes {
            return Err(ErrorKind::TooManyExpressions);
        }

        let id = NodeId(self.nodes.len() as u16);
        self.nodes.push(ExprNode { expr, next: None });
        Ok(id)
    }

    pub fn link(&mut self, node: NodeId, next: NodeId) {
        if let Some(n) = self.nodes.get_mut(node.index()) {
            n.next = Some(next);
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&ExprNode> {
        self.nodes.get(id.index())
    }

    /// Walk the expressions of a list in order
    pub fn list(&self, head: Option<NodeId>) -> ListIter<'_> {
        ListIter { pool: self, next: head }
    }

    pub fn leaf_count(&self) -> usize {
        self.low
    }

    pub fn compound_count(&self) -> usize {
        self.slots.len() - self.high
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

pub struct ListIter<'a> {
    pool: &'a ExpressionPool,
    next: Option<NodeId>,
}

impl Iterator for ListIter<'_> {
    type Item = ExprId;

    fn next(&mut self) -> Option<ExprId> {
        let node = self.pool.node(self.next?)?;
        self.next = node.next;
        Some(node.expr)
    }
}
