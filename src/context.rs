use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::ast::{Siblings, StatementPool, StmtId};
use crate::error::{ErrorKind, SbcError};
use crate::expression::ExpressionPool;
use crate::lexer::Lexer;
use crate::limits::{LimitError, PoolLimits};
use crate::parser;
use crate::string_storage::StringPool;

/// Everything a parse produces: the pools, the root body and the last error
///
/// The pools are sized once from the limits and rewound at the start of
/// every parse, so a context can be reused for many programs.
pub struct ParserContext {
    limits: PoolLimits,
    pub strings: StringPool,
    pub exprs: ExpressionPool,
    pub stmts: StatementPool,
    root: Option<StmtId>,
    error: Option<ErrorKind>,
}

impl ParserContext {
    /// Create a context from limits that already passed `validate`
    ///
    /// Pool handles are 16 bits wide; larger capacities are only caught by
    /// `with_limits`.
    pub fn new(limits: PoolLimits) -> Self {
        Self {
            strings: StringPool::new(limits.string_pool_bytes),
            exprs: ExpressionPool::new(limits.max_expressions, limits.max_expr_nodes),
            stmts: StatementPool::new(limits.max_statements),
            limits,
            root: None,
            error: None,
        }
    }

    /// Validate the limits, then create the context
    pub fn with_limits(limits: PoolLimits) -> Result<Self, LimitError> {
        limits.validate()?;
        Ok(Self::new(limits))
    }

    pub fn limits(&self) -> &PoolLimits {
        &self.limits
    }

    /// Forget the previous program
    pub fn reset(&mut self) {
        self.strings.reset();
        self.exprs.reset();
        self.stmts.reset();
        self.root = None;
        self.error = None;
    }

    /// Parse a tokenized program file
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Option<StmtId>, SbcError> {
        self.reset();
        match Lexer::open(path, &self.limits) {
            Ok(lexer) => self.run(lexer),
            Err(e) => {
                self.error = Some(e.kind());
                Err(e)
            }
        }
    }

    /// Parse a tokenized program from any reader
    pub fn parse_reader<R: Read>(&mut self, reader: R) -> Result<Option<StmtId>, SbcError> {
        self.reset();
        let lexer = Lexer::new(reader, &self.limits);
        self.run(lexer)
    }

    // The lexer, and with it the reader, is dropped on every exit path
    fn run<R: Read>(&mut self, lexer: Lexer<R>) -> Result<Option<StmtId>, SbcError> {
        match parser::parse(lexer, self) {
            Ok(root) => {
                self.root = root;
                debug!(
                    statements = self.stmts.len(),
                    leaves = self.exprs.leaf_count(),
                    compounds = self.exprs.compound_count(),
                    string_bytes = self.strings.len(),
                    "parse complete"
                );
                Ok(root)
            }
            Err(e) => {
                debug!(error = %e, "parse failed");
                self.error = Some(e.kind());
                Err(e)
            }
        }
    }

    /// First statement of the program
    pub fn root(&self) -> Option<StmtId> {
        self.root
    }

    /// Error of the last failed parse
    pub fn current_error(&self) -> Option<ErrorKind> {
        self.error
    }

    /// Statements of a body list, in order
    pub fn body(&self, head: Option<StmtId>) -> Siblings<'_> {
        self.stmts.siblings(head)
    }
}

impl Default for ParserContext {
    fn default() -> Self {
        Self::new(PoolLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StatementKind;
    use crate::encode::crunch;
    use std::io::Cursor;

    #[test]
    fn test_reuse_resets_pools() {
        let mut ctx = ParserContext::new(PoolLimits::small());

        let image = crunch("10 A=1\n20 B=2\n").unwrap();
        ctx.parse_reader(Cursor::new(image)).unwrap();
        assert_eq!(ctx.stmts.len(), 2);

        let image = crunch("10 END\n").unwrap();
        let root = ctx.parse_reader(Cursor::new(image)).unwrap();
        assert_eq!(ctx.stmts.len(), 1);
        assert_eq!(ctx.strings.len(), 0);

        let kinds: Vec<StatementKind> = ctx.body(root).map(|(_, s)| s.kind).collect();
        assert_eq!(kinds, vec![StatementKind::End]);
    }

    #[test]
    fn test_error_is_recorded() {
        let mut ctx = ParserContext::new(PoolLimits::small());

        let image = crunch("10 NEXT\n").unwrap();
        let err = ctx.parse_reader(Cursor::new(image)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NextUnexpected);
        assert_eq!(ctx.current_error(), Some(ErrorKind::NextUnexpected));
        assert_eq!(ctx.root(), None);

        // A successful parse clears it
        let image = crunch("10 END\n").unwrap();
        ctx.parse_reader(Cursor::new(image)).unwrap();
        assert_eq!(ctx.current_error(), None);
        assert!(ctx.root().is_some());
    }

    #[test]
    fn test_with_limits_rejects_unaddressable_pools() {
        let mut limits = PoolLimits::small();
        limits.max_expressions = 70_000;
        let err = ParserContext::with_limits(limits).err().unwrap();
        assert!(err.message.contains("max_expressions"));

        let ctx = ParserContext::with_limits(PoolLimits::medium()).unwrap();
        assert_eq!(ctx.limits(), &PoolLimits::medium());
    }

    #[test]
    fn test_open_failure_is_recorded() {
        let mut ctx = ParserContext::default();
        let err = ctx.parse_file("/nonexistent/prog.bbc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
        assert_eq!(ctx.current_error(), Some(ErrorKind::Open));
    }

    #[test]
    fn test_parse_file() {
        let path = std::env::temp_dir().join("sbc_context_test.bbc");
        std::fs::write(&path, crunch("10 PRINT 1\n20 END\n").unwrap()).unwrap();

        let mut ctx = ParserContext::default();
        let root = ctx.parse_file(&path).unwrap();
        assert_eq!(ctx.body(root).count(), 2);

        let _ = std::fs::remove_file(&path);
    }
}
