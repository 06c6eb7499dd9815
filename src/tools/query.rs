//! Query execution tool.
//!
//! This module implements the `query` MCP tool. Every statement is classified
//! and checked against the process policy before a session is leased, so a
//! denied statement never reaches the database.

use crate::db::{Connector, QueryExecutor};
use crate::error::GatewayResult;
use crate::models::{QueryResult, Statement, StatementKind};
use crate::tools::policy::{self, Decision, Policy};
use schemars::JsonSchema;
use tracing::{info, warn};

/// Input for the query tool.
#[derive(Debug, Clone, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute. DDL is always rejected; INSERT/UPDATE/DELETE only when writes are enabled.
    pub sql: String,
}

/// Handler for the query tool.
pub struct QueryToolHandler<C: Connector> {
    executor: QueryExecutor<C>,
    policy: Policy,
}

impl<C: Connector> QueryToolHandler<C> {
    pub fn new(executor: QueryExecutor<C>, policy: Policy) -> Self {
        Self { executor, policy }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Classify, gate and run one statement.
    pub async fn query(&self, input: QueryInput) -> GatewayResult<QueryResult> {
        let statement = Statement::new(input.sql);
        let kind = statement.kind();

        let decision = policy::check(&statement, &self.policy);
        if let Decision::Deny(reason) = decision {
            warn!(kind = %kind, reason, "Statement denied by policy");
        }
        decision.into_result(kind)?;

        if kind == StatementKind::Unknown {
            warn!(sql = %statement.sql(), "Running unclassified statement");
        }

        let result = self.executor.execute(&statement).await?;
        info!(kind = %kind, row_count = result.row_count, "Query completed");
        Ok(result)
    }
}
