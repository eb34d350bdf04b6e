// Diagnostic rendering of tokens, expressions and the statement tree

use std::fmt::Write;

use crate::ast::{Head, Statement, StatementData, StatementKind, StmtId};
use crate::context::ParserContext;
use crate::expression::{ExprId, Expression, NodeId};
use crate::lexer::{Token, TokenKind};

/// One line describing a token
pub fn render_token(token: &Token, text: &[u8]) -> String {
    let text = String::from_utf8_lossy(text);
    match token.kind {
        TokenKind::Eof => "EOF".to_string(),
        TokenKind::LineLabel(n) => format!("LINE {}", n),
        TokenKind::Keyword(k) => format!("KEYWORD {}", k),
        TokenKind::Operator(_) => format!("OPERATOR {}", text),
        TokenKind::Str => format!("STRING \"{}\"", text),
        TokenKind::Integer(v) => format!("INTEGER {}", v),
        TokenKind::Hex(v) => format!("HEX &{:X}", v as u32),
        TokenKind::Bin(v) => format!("BIN %{:b}", v as u32),
        TokenKind::Real(r) => format!("REAL {}", r.to_f32()),
        TokenKind::Identifier(_) => format!("IDENTIFIER {}", text),
        TokenKind::LineNumber(n) => format!("LINENUMBER {}", n),
        TokenKind::Rem => format!("REM{}", text),
        TokenKind::Unknown => format!("UNKNOWN {}", text),
    }
}

/// Render an expression as an S-expression, e.g. `(+ 2 (* 3 4))`
pub fn render_expr(ctx: &ParserContext, id: ExprId) -> String {
    let mut out = String::new();
    write_expr(&mut out, ctx, id);
    out
}

fn write_expr(out: &mut String, ctx: &ParserContext, id: ExprId) {
    let Some(expr) = ctx.exprs.get(id) else {
        out.push('?');
        return;
    };

    // Writing to a String cannot fail
    let _ = match *expr {
        Expression::Integer(v) => write!(out, "{}", v),
        Expression::Hex(v) => write!(out, "&{:X}", v as u32),
        Expression::Bin(v) => write!(out, "%{:b}", v as u32),
        Expression::Real(r) => write!(out, "{}", r.to_f32()),
        Expression::Identifier { name, .. } => write!(out, "{}", ctx.strings.text(name)),
        Expression::Str(text) => write!(out, "\"{}\"", ctx.strings.text(text)),
        Expression::Binary { op, lhs, rhs } => {
            let _ = write!(out, "({} ", op.symbol());
            write_expr(out, ctx, lhs);
            out.push(' ');
            write_expr(out, ctx, rhs);
            write!(out, ")")
        }
        Expression::Unary { op, operand } => {
            let _ = write!(out, "({} ", op.symbol());
            write_expr(out, ctx, operand);
            write!(out, ")")
        }
        Expression::Nullary(builtin) => write!(out, "{}", builtin.symbol()),
        Expression::FnCall { name, args } => {
            let _ = write!(out, "(FN {}", ctx.strings.text(name));
            for arg in ctx.exprs.list(args) {
                out.push(' ');
                write_expr(out, ctx, arg);
            }
            write!(out, ")")
        }
    };
}

fn render_list(ctx: &ParserContext, head: Option<NodeId>) -> String {
    ctx.exprs
        .list(head)
        .map(|e| render_expr(ctx, e))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Statement kind followed by its operands
pub fn render_statement(ctx: &ParserContext, s: &Statement) -> String {
    let mut out = s.kind.name().to_string();

    let _ = match s.data {
        StatementData::Empty => Ok(()),
        StatementData::Assignment { target, op, value, .. } => write!(
            out,
            " {} {} {}",
            ctx.strings.text(target),
            op.symbol(),
            render_expr(ctx, value)
        ),
        StatementData::Compound { id, head, .. } => {
            if let Some(id) = id {
                let _ = write!(out, " {}", ctx.strings.text(id));
            }
            match head {
                Head::None => Ok(()),
                Head::Expr(e) => write!(out, " {}", render_expr(ctx, e)),
                Head::List(None) => write!(out, " []"),
                Head::List(list) => write!(out, " [{}]", render_list(ctx, list)),
            }
        }
        StatementData::Exprs(exprs) => {
            let parts: Vec<String> = exprs.iter().flatten().map(|&e| render_expr(ctx, e)).collect();
            write!(out, " {}", parts.join(", "))
        }
        StatementData::List(list) => write!(out, " {}", render_list(ctx, list)),
        StatementData::Expr(Some(e)) => write!(out, " {}", render_expr(ctx, e)),
        StatementData::Expr(None) => Ok(()),
        StatementData::LineNumber(n) => write!(out, " {}", n),
        // Comment text keeps its own leading space
        StatementData::Text(Some(text)) if s.kind == StatementKind::Rem => {
            write!(out, "{}", ctx.strings.text(text))
        }
        StatementData::Text(Some(text)) => write!(out, " {}", ctx.strings.text(text)),
        StatementData::Text(None) => Ok(()),
        StatementData::Call { name, args: None } => write!(out, " {}", ctx.strings.text(name)),
        StatementData::Call { name, args } => {
            write!(out, " {} [{}]", ctx.strings.text(name), render_list(ctx, args))
        }
    };

    out
}

/// Indented listing of the whole program, one statement per line
pub fn render_tree(ctx: &ParserContext) -> String {
    let mut out = String::new();
    write_body(&mut out, ctx, ctx.root(), 0);
    out
}

fn write_body(out: &mut String, ctx: &ParserContext, head: Option<StmtId>, depth: usize) {
    for (_, s) in ctx.body(head) {
        let _ = writeln!(
            out,
            "{:>5} {}{}",
            s.line_no,
            "  ".repeat(depth),
            render_statement(ctx, s)
        );
        if let Some(body) = s.body() {
            write_body(out, ctx, Some(body), depth + 1);
        }
    }
}

/// Pool usage against capacity
pub fn render_usage(ctx: &ParserContext) -> String {
    let limits = ctx.limits();
    format!(
        "strings: {}/{} bytes\nexpressions: {} leaves, {} compound/{}\nlist nodes: {}/{}\nstatements: {}/{}\n",
        ctx.strings.len(),
        limits.string_pool_bytes,
        ctx.exprs.leaf_count(),
        ctx.exprs.compound_count(),
        limits.max_expressions,
        ctx.exprs.node_count(),
        limits.max_expr_nodes,
        ctx.stmts.len(),
        limits.max_statements,
    )
}
