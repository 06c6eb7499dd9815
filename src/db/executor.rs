//! Statement execution.
//!
//! The executor leases one session per statement, runs the text exactly as
//! given and returns the session on every path. Driver failures become
//! execution errors carrying the driver's own message.

use crate::db::pool::{ConnectionPool, Connector};
use crate::error::{GatewayError, GatewayResult, driver_message};
use crate::models::{QueryResult, Statement};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Runs classified statements on pooled sessions.
pub struct QueryExecutor<C: Connector> {
    pool: ConnectionPool<C>,
}

impl<C: Connector> Clone for QueryExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<C: Connector> QueryExecutor<C> {
    pub fn new(pool: ConnectionPool<C>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    /// Execute one statement and normalize its result.
    ///
    /// Fails with a connection error when no session can be opened and with an
    /// execution error when the server rejects the statement.
    pub async fn execute(&self, statement: &Statement) -> GatewayResult<QueryResult> {
        let start = Instant::now();
        debug!(kind = %statement.kind(), sql = %statement.sql(), "Executing statement");

        let mut lease = self.pool.acquire().await?;
        match lease.run(statement).await {
            Ok(data) => {
                lease.release();
                let result = QueryResult::from_data(data);
                debug!(
                    row_count = result.row_count,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Statement completed"
                );
                Ok(result)
            }
            Err(err) => {
                if is_transport_fault(&err) {
                    warn!(error = %err, "Session failed mid-statement");
                    lease.discard();
                } else {
                    lease.release();
                }

                let (message, sql_state) = driver_message(&err);
                error!(
                    error = %message,
                    sql_state = ?sql_state,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Statement failed"
                );
                Err(GatewayError::execution(message, sql_state))
            }
        }
    }
}

/// Errors after which the session's protocol state cannot be trusted.
fn is_transport_fault(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::PoolClosed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryConnector, Scripted};
    use crate::models::{QueryData, Row};

    fn executor(connector: &MemoryConnector, size: usize) -> QueryExecutor<MemoryConnector> {
        QueryExecutor::new(ConnectionPool::new(connector.clone(), size).unwrap())
    }

    #[tokio::test]
    async fn test_read_returns_rows() {
        let connector = MemoryConnector::new().on(
            "SELECT id FROM users",
            Scripted::rows(vec![Row::new().with("id", 1i64), Row::new().with("id", 2i64)]),
        );
        let executor = executor(&connector, 2);

        let result = executor
            .execute(&Statement::new("SELECT id FROM users"))
            .await
            .unwrap();
        assert_eq!(result.row_count, 2);
        assert!(matches!(result.data, QueryData::Rows(_)));
        assert_eq!(executor.pool().status().in_use, 0);
    }

    #[tokio::test]
    async fn test_write_returns_outcome() {
        let connector = MemoryConnector::new().on(
            "INSERT INTO logs VALUES (1)",
            Scripted::outcome(1, 42),
        );
        let executor = executor(&connector, 2);

        let result = executor
            .execute(&Statement::new("INSERT INTO logs VALUES (1)"))
            .await
            .unwrap();
        assert_eq!(result.row_count, 0);
        match result.data {
            QueryData::Outcome(outcome) => {
                assert_eq!(outcome.affected_rows, 1);
                assert_eq!(outcome.insert_id, 42);
            }
            other => panic!("expected outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_statement_text_is_sent_verbatim() {
        let connector = MemoryConnector::new();
        let executor = executor(&connector, 1);
        let sql = "  select 1 ;  ";
        executor.execute(&Statement::new(sql)).await.unwrap();
        assert_eq!(connector.executed(), vec![sql.to_string()]);
    }

    #[tokio::test]
    async fn test_database_error_keeps_driver_message_and_releases() {
        let connector = MemoryConnector::new().on(
            "SELECT * FROM nope",
            Scripted::database_error("Table 'shuwu.nope' doesn't exist", "42S02"),
        );
        let executor = executor(&connector, 1);

        let err = executor
            .execute(&Statement::new("SELECT * FROM nope"))
            .await
            .unwrap_err();
        match &err {
            GatewayError::Execution { message, sql_state } => {
                assert_eq!(message, "Table 'shuwu.nope' doesn't exist");
                assert_eq!(sql_state.as_deref(), Some("42S02"));
            }
            other => panic!("expected execution error, got {:?}", other),
        }

        let status = executor.pool().status();
        assert_eq!(status.in_use, 0);
        assert_eq!(status.idle, 1);
    }

    #[tokio::test]
    async fn test_transport_fault_discards_session() {
        let connector = MemoryConnector::new().on("SELECT SLEEP(100)", Scripted::io_error("broken pipe"));
        let executor = executor(&connector, 1);

        let err = executor
            .execute(&Statement::new("SELECT SLEEP(100)"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Execution { .. }));
        assert_eq!(executor.pool().status().idle, 0);

        executor.execute(&Statement::new("SELECT 1")).await.unwrap();
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        let connector = MemoryConnector::new();
        connector.set_fail_connect(true);
        let executor = executor(&connector, 1);

        let err = executor
            .execute(&Statement::new("SELECT 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Connection { .. }));
        assert_eq!(executor.pool().status().in_use, 0);
    }
}
