//! MySQL backend.
//!
//! Statements run as unnamed prepared statements, so the server parses exactly
//! one statement per call and rejects `;`-separated batches even though the
//! driver negotiates multi-statement support. Statements MySQL cannot prepare
//! fall back to the text protocol.

use crate::db::pool::{Connector, Session};
use crate::db::types::decode_row;
use crate::models::{ExecOutcome, QueryData, Statement};
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use sqlx::mysql::{
    MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlQueryResult, MySqlRow,
};
use sqlx::{ConnectOptions, Connection, Either, Executor};
use std::time::Duration;
use tracing::debug;

/// Default time allowed for opening one session.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// ER_UNSUPPORTED_PS: "This command is not supported in the prepared statement protocol yet"
const ER_UNSUPPORTED_PS: u16 = 1295;

type ResultStream<'e> = BoxStream<'e, Result<Either<MySqlQueryResult, MySqlRow>, sqlx::Error>>;

/// Opens MySQL sessions with fixed connect options.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    options: MySqlConnectOptions,
    connect_timeout: Duration,
    target: String,
}

impl MySqlConnector {
    /// `target` is a credential-free description such as `localhost:3306/shuwu`.
    pub fn new(options: MySqlConnectOptions, target: impl Into<String>) -> Self {
        Self {
            options: options.charset("utf8mb4"),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            target: target.into(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Connector for MySqlConnector {
    type Session = MySqlConnection;

    async fn connect(&self) -> Result<MySqlConnection, sqlx::Error> {
        match tokio::time::timeout(self.connect_timeout, self.options.connect()).await {
            Ok(result) => result,
            Err(_) => Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!(
                    "connecting to {} timed out after {}s",
                    self.target,
                    self.connect_timeout.as_secs()
                ),
            ))),
        }
    }

    fn target(&self) -> String {
        self.target.clone()
    }
}

/// Whether the server refused to prepare a statement it would run as text.
fn is_unsupported_prepared(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|e| e.number() == ER_UNSUPPORTED_PS),
        _ => false,
    }
}

async fn collect(
    mut stream: ResultStream<'_>,
    statement: &Statement,
) -> Result<QueryData, sqlx::Error> {
    let mut rows = Vec::new();
    let mut outcome = ExecOutcome::default();
    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(result) => {
                outcome.affected_rows += result.rows_affected();
                if result.last_insert_id() != 0 {
                    outcome.insert_id = result.last_insert_id();
                }
            }
            Either::Right(row) => rows.push(decode_row(&row)),
        }
    }

    if statement.expects_rows() || !rows.is_empty() {
        Ok(QueryData::Rows(rows))
    } else {
        Ok(QueryData::Outcome(outcome))
    }
}

impl Session for MySqlConnection {
    /// Runs the text as-is with no parameter binding. The prepared statement
    /// is not cached.
    async fn run(&mut self, statement: &Statement) -> Result<QueryData, sqlx::Error> {
        let prepared = sqlx::query::<sqlx::MySql>(statement.sql()).persistent(false);
        match collect((&mut *self).fetch_many(prepared), statement).await {
            Err(e) if is_unsupported_prepared(&e) => {
                debug!("Statement cannot be prepared, running it over the text protocol");
                let text = sqlx::raw_sql(statement.sql());
                collect((&mut *self).fetch_many(text), statement).await
            }
            result => result,
        }
    }

    async fn ping(&mut self) -> Result<(), sqlx::Error> {
        Connection::ping(self).await
    }

    async fn close(self) {
        if let Err(e) = Connection::close(self).await {
            debug!(error = %e, "Error while closing MySQL session");
        }
    }
}
