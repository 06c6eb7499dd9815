//! Access policy for classified statements.
//!
//! The policy is built once at startup and never mutated. The gate itself is a
//! pure function of the statement kind and the policy. Multi-statement text is
//! refused before the kind is consulted, since only the first statement's
//! keyword is classified.

use crate::error::GatewayError;
use crate::models::{Statement, StatementKind};

pub const DDL_DENIED: &str = "DDL statements are not permitted";
pub const WRITE_DENIED: &str = "write operations are disabled";
pub const UNCLASSIFIED_DENIED: &str = "unclassified statements are not permitted";
pub const BATCH_DENIED: &str = "multiple statements are not permitted";

/// Process-wide access policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Permit INSERT/UPDATE/DELETE. DDL stays denied regardless.
    pub allow_write: bool,
    /// Refuse statements whose leading keyword is not recognized.
    pub deny_unclassified: bool,
}

impl Policy {
    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn with_writes(allow_write: bool) -> Self {
        Self {
            allow_write,
            ..Self::default()
        }
    }
}

/// Outcome of evaluating a statement kind against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Turn a denial into the error reported to the caller.
    pub fn into_result(self, kind: StatementKind) -> Result<(), GatewayError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(GatewayError::policy_violation(kind.as_str(), reason)),
        }
    }
}

/// Decide whether a statement of `kind` may run under `policy`.
pub fn decide(kind: StatementKind, policy: &Policy) -> Decision {
    match kind {
        StatementKind::Ddl => Decision::Deny(DDL_DENIED),
        StatementKind::Write if !policy.allow_write => Decision::Deny(WRITE_DENIED),
        StatementKind::Write | StatementKind::Read => Decision::Allow,
        StatementKind::Unknown if policy.deny_unclassified => Decision::Deny(UNCLASSIFIED_DENIED),
        StatementKind::Unknown => Decision::Allow,
    }
}

/// Gate a statement: batches are always denied, otherwise [`decide`] on its kind.
pub fn check(statement: &Statement, policy: &Policy) -> Decision {
    if statement.is_batch() {
        return Decision::Deny(BATCH_DENIED);
    }
    decide(statement.kind(), policy)
}
