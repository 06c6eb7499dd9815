//! SQL statement model.

use crate::tools::classifier;
use std::fmt;

/// Coarse classification of a statement, derived from its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// SELECT, SHOW, DESCRIBE, DESC
    Read,
    /// INSERT, UPDATE, DELETE
    Write,
    /// CREATE, DROP, ALTER, TRUNCATE
    Ddl,
    /// Anything that does not start with a recognized keyword
    Unknown,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Ddl => "ddl",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw SQL text together with its kind, classified once on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    kind: StatementKind,
    batch: bool,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let kind = classifier::classify(&sql);
        let batch = classifier::is_batch(&sql);
        Self { sql, kind, batch }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Whether the text holds several `;`-separated statements.
    pub fn is_batch(&self) -> bool {
        self.batch
    }

    /// Whether the statement must yield a row sequence even when no rows match.
    pub fn expects_rows(&self) -> bool {
        self.kind == StatementKind::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_is_classified_on_construction() {
        let stmt = Statement::new("  select 1");
        assert_eq!(stmt.kind(), StatementKind::Read);
        assert_eq!(stmt.sql(), "  select 1");
        assert!(stmt.expects_rows());
    }

    #[test]
    fn test_write_statement_does_not_expect_rows() {
        let stmt = Statement::new("UPDATE users SET name = 'x'");
        assert_eq!(stmt.kind(), StatementKind::Write);
        assert!(!stmt.expects_rows());
    }

    #[test]
    fn test_batch_is_detected_on_construction() {
        let stmt = Statement::new("SELECT 1; DROP TABLE users");
        assert_eq!(stmt.kind(), StatementKind::Read);
        assert!(stmt.is_batch());
        assert!(!Statement::new("SELECT 1;").is_batch());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(StatementKind::Ddl.to_string(), "ddl");
        assert_eq!(StatementKind::Unknown.to_string(), "unknown");
    }
}
