use std::io::Read;

use super::Parser;
use crate::error::{ErrorKind, SbcError};
use crate::expression::{BinaryOp, ExprId, Expression, Nullary, UnaryOp};
use crate::keyword::Keyword;
use crate::lexer::{Operator, TokenKind};

// Operator tables, loosest binding first

fn logical_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Keyword(Keyword::OR) => Some(BinaryOp::Or),
        TokenKind::Keyword(Keyword::EOR) => Some(BinaryOp::Eor),
        _ => None,
    }
}

fn and_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Keyword(Keyword::AND) => Some(BinaryOp::And),
        _ => None,
    }
}

fn relational_op(kind: TokenKind) -> Option<BinaryOp> {
    let TokenKind::Operator(op) = kind else {
        return None;
    };
    match op {
        Operator::Equals => Some(BinaryOp::Eq),
        Operator::Neq => Some(BinaryOp::Neq),
        Operator::Lt => Some(BinaryOp::Lt),
        Operator::Gt => Some(BinaryOp::Gt),
        Operator::Lte => Some(BinaryOp::Lte),
        Operator::Gte => Some(BinaryOp::Gte),
        Operator::Lsl => Some(BinaryOp::Lsl),
        Operator::Lsr => Some(BinaryOp::Lsr),
        Operator::Asr => Some(BinaryOp::Asr),
        _ => None,
    }
}

fn multiplicative_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Operator(Operator::Star) => Some(BinaryOp::Mul),
        TokenKind::Operator(Operator::Slash) => Some(BinaryOp::RDiv),
        TokenKind::Keyword(Keyword::DIV) => Some(BinaryOp::Div),
        TokenKind::Keyword(Keyword::MOD) => Some(BinaryOp::Mod),
        _ => None,
    }
}

fn unary_builtin(keyword: Keyword) -> Option<UnaryOp> {
    match keyword {
        Keyword::RND => Some(UnaryOp::Rnd),
        Keyword::RAD => Some(UnaryOp::Rad),
        Keyword::SIN => Some(UnaryOp::Sin),
        Keyword::COS => Some(UnaryOp::Cos),
        Keyword::SQR => Some(UnaryOp::Sqr),
        Keyword::CHR_STR => Some(UnaryOp::ChrStr),
        _ => None,
    }
}

fn nullary_builtin(keyword: Keyword) -> Option<Nullary> {
    match keyword {
        Keyword::GET => Some(Nullary::Get),
        Keyword::TIME => Some(Nullary::Time),
        Keyword::PI => Some(Nullary::Pi),
        _ => None,
    }
}

// Recursive expression parsing methods
//
// Every level leaves the token following its expression as the current
// token.
impl<R: Read> Parser<'_, R> {
    /// Parse an expression starting at the current token
    pub(super) fn parse_expression(&mut self) -> Result<ExprId, SbcError> {
        self.parse_level(Level::Logical)
    }

    /// Advance past the current token, then parse an expression
    pub(super) fn parse_next_expression(&mut self) -> Result<ExprId, SbcError> {
        self.advance()?;
        self.parse_expression()
    }

    fn parse_level(&mut self, level: Level) -> Result<ExprId, SbcError> {
        let Some(operand) = level.operand() else {
            return self.parse_primary();
        };

        let mut lhs = self.parse_level(operand)?;

        loop {
            let kind = self.kind();
            let op = match level {
                Level::Logical => logical_op(kind),
                Level::And => and_op(kind),
                Level::Relational => relational_op(kind),
                Level::Additive => match kind {
                    TokenKind::Operator(Operator::Plus) => Some(BinaryOp::Add),
                    TokenKind::Operator(Operator::Minus) => Some(BinaryOp::Sub),

                    // `a -3` lexes as `a` followed by the literal -3. The
                    // literal stays current and becomes the right operand.
                    TokenKind::Integer(v) if v < 0 => {
                        let rhs = self.parse_level(operand)?;
                        lhs = self.add_compound(Expression::Binary {
                            op: BinaryOp::Add,
                            lhs,
                            rhs,
                        })?;
                        continue;
                    }
                    TokenKind::Real(r) if r.is_negative() => {
                        let rhs = self.parse_level(operand)?;
                        lhs = self.add_compound(Expression::Binary {
                            op: BinaryOp::Add,
                            lhs,
                            rhs,
                        })?;
                        continue;
                    }
                    _ => None,
                },
                Level::Multiplicative => multiplicative_op(kind),
                Level::Unary | Level::Primary => None,
            };

            let Some(op) = op else {
                break;
            };

            self.advance()?;
            let rhs = self.parse_level(operand)?;
            lhs = self.add_compound(Expression::Binary { op, lhs, rhs })?;
        }

        Ok(lhs)
    }

    /// Literals, identifiers, brackets, built-ins and FN calls
    fn parse_primary(&mut self) -> Result<ExprId, SbcError> {
        let leaf = match self.kind() {
            TokenKind::Integer(v) => self.ctx.exprs.add_int(v),
            TokenKind::Hex(v) => self.ctx.exprs.add_hex(v),
            TokenKind::Bin(v) => self.ctx.exprs.add_bin(v),
            TokenKind::Real(r) => self.ctx.exprs.add_real(r),
            TokenKind::Identifier(kind) => {
                let name = self.intern_token()?;
                self.ctx.exprs.add_identifier(name, kind)
            }
            TokenKind::Str => {
                let text = self.intern_token()?;
                self.ctx.exprs.add_string(text)
            }
            TokenKind::Operator(Operator::OpenBracket) => {
                let inner = self.parse_next_expression()?;
                self.expect_operator(Operator::CloseBracket, ErrorKind::CloseBracketExpected)?;
                return Ok(inner);
            }
            // Prefix minus and the one-argument built-ins take a primary,
            // so -B+C is (-B)+C and RND(10)+1 is RND(10) plus one
            TokenKind::Operator(Operator::Minus) => {
                self.advance()?;
                let operand = self.parse_primary()?;
                return self.add_compound(Expression::Unary {
                    op: UnaryOp::Neg,
                    operand,
                });
            }
            TokenKind::Keyword(Keyword::FN) => return self.parse_fn_call(),
            TokenKind::Keyword(keyword) => {
                if let Some(op) = unary_builtin(keyword) {
                    self.advance()?;
                    let operand = self.parse_primary()?;
                    return self.add_compound(Expression::Unary { op, operand });
                }
                if let Some(builtin) = nullary_builtin(keyword) {
                    self.advance()?;
                    return self.add_compound(Expression::Nullary(builtin));
                }
                return Err(self.fail(ErrorKind::ExpressionExpected));
            }
            _ => return Err(self.fail(ErrorKind::ExpressionExpected)),
        };

        let id = leaf.map_err(|k| self.fail(k))?;
        self.advance()?;
        Ok(id)
    }

    /// FN name [ ( args ) ]
    fn parse_fn_call(&mut self) -> Result<ExprId, SbcError> {
        self.advance()?;
        if !matches!(self.kind(), TokenKind::Identifier(_)) {
            return Err(self.fail(ErrorKind::IdentifierExpected));
        }
        let name = self.intern_token()?;
        let args = self.parse_bracketed_node_list()?;
        self.add_compound(Expression::FnCall { name, args })
    }
}

/// Precedence levels, loosest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Logical,        // OR EOR
    And,            // AND
    Relational,     // = <> < > <= >= << >> >>>
    Additive,       // + -
    Multiplicative, // * / DIV MOD
    Unary,
    Primary,
}

impl Level {
    /// The level parsed for each operand of this one
    fn operand(self) -> Option<Level> {
        match self {
            Level::Logical => Some(Level::And),
            Level::And => Some(Level::Relational),
            Level::Relational => Some(Level::Additive),
            Level::Additive => Some(Level::Multiplicative),
            Level::Multiplicative => Some(Level::Unary),
            Level::Unary => Some(Level::Primary),
            Level::Primary => None,
        }
    }
}
