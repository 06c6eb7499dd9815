//! Scripted in-memory backend.
//!
//! `MemoryConnector` answers statements from a table of canned responses and
//! records what it was asked to run. It lets the pool, executor, catalog and
//! dispatcher be exercised without a MySQL server.
//!
//! Only compiled for tests and with the `test-util` feature.

use crate::db::pool::{Connector, Session};
use crate::models::{ExecOutcome, QueryData, Row, Statement};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A canned response for one SQL text.
#[derive(Debug, Clone)]
pub enum Scripted {
    Rows(Vec<Row>),
    Outcome(ExecOutcome),
    /// Server-side error, like a syntax error or unknown table.
    DatabaseError { message: String, code: String },
    /// Transport fault that leaves the session unusable.
    IoError(String),
}

impl Scripted {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self::Rows(rows)
    }

    pub fn outcome(affected_rows: u64, insert_id: u64) -> Self {
        Self::Outcome(ExecOutcome {
            affected_rows,
            insert_id,
        })
    }

    pub fn database_error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::DatabaseError {
            message: message.into(),
            code: code.into(),
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::IoError(message.into())
    }
}

/// Database error raised by a scripted response.
#[derive(Debug)]
pub struct ScriptedDatabaseError {
    message: String,
    code: String,
}

impl fmt::Display for ScriptedDatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ScriptedDatabaseError {}

impl sqlx::error::DatabaseError for ScriptedDatabaseError {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
        Some(std::borrow::Cow::Borrowed(&self.code))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::Other
    }
}

#[derive(Default)]
struct MemoryState {
    responses: Mutex<HashMap<String, Scripted>>,
    executed: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    fail_connect: AtomicBool,
    /// Sessions opened before the current generation have been dropped by the server.
    generation: AtomicUsize,
    connects: AtomicUsize,
    pings: AtomicUsize,
    closed_sessions: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl MemoryState {
    fn response_for(&self, statement: &Statement) -> Scripted {
        let scripted = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(statement.sql().trim())
            .cloned();

        scripted.unwrap_or_else(|| {
            if statement.expects_rows() {
                Scripted::Rows(Vec::new())
            } else {
                Scripted::Outcome(ExecOutcome::default())
            }
        })
    }
}

/// Connector backed by scripted responses. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<MemoryState>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` (compared after trimming) with `response`.
    ///
    /// Unscripted statements return no rows when they read and an empty
    /// outcome otherwise.
    pub fn on(self, sql: &str, response: Scripted) -> Self {
        self.state
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sql.trim().to_string(), response);
        self
    }

    /// Hold every statement for `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self
            .state
            .delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
        self
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Drop every open session server-side, as MySQL does after `wait_timeout`.
    /// Later pings and statements on those sessions fail with an I/O error.
    pub fn kill_sessions(&self) {
        self.state.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of liveness checks attempted.
    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::SeqCst)
    }

    /// Number of sessions opened so far.
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn closed_sessions(&self) -> usize {
        self.state.closed_sessions.load(Ordering::SeqCst)
    }

    /// Highest number of statements observed running at once.
    pub fn peak_active(&self) -> usize {
        self.state.peak_active.load(Ordering::SeqCst)
    }

    /// SQL texts that reached a session, in execution order.
    pub fn executed(&self) -> Vec<String> {
        self.state
            .executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn connect(&self) -> Result<MemorySession, sqlx::Error> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Connection refused",
            )));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            generation: self.state.generation.load(Ordering::SeqCst),
            state: Arc::clone(&self.state),
        })
    }

    fn target(&self) -> String {
        "memory".to_string()
    }
}

/// Session handed out by [`MemoryConnector`].
pub struct MemorySession {
    state: Arc<MemoryState>,
    generation: usize,
}

impl MemorySession {
    fn check_alive(&self) -> Result<(), sqlx::Error> {
        if self.generation < self.state.generation.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "server has gone away",
            )));
        }
        Ok(())
    }
}

impl Session for MemorySession {
    async fn run(&mut self, statement: &Statement) -> Result<QueryData, sqlx::Error> {
        self.check_alive()?;
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_active.fetch_max(active, Ordering::SeqCst);

        let delay = *self
            .state
            .delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.state
            .executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(statement.sql().to_string());
        let response = self.state.response_for(statement);
        self.state.active.fetch_sub(1, Ordering::SeqCst);

        match response {
            Scripted::Rows(rows) => Ok(QueryData::Rows(rows)),
            Scripted::Outcome(outcome) => Ok(QueryData::Outcome(outcome)),
            Scripted::DatabaseError { message, code } => Err(sqlx::Error::Database(Box::new(
                ScriptedDatabaseError { message, code },
            ))),
            Scripted::IoError(message) => Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                message,
            ))),
        }
    }

    async fn ping(&mut self) -> Result<(), sqlx::Error> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        self.check_alive()
    }

    async fn close(self) {
        self.state.closed_sessions.fetch_add(1, Ordering::SeqCst);
    }
}
