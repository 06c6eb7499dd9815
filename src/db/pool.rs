//! Bounded connection pool.
//!
//! The pool hands out at most `max_size` sessions at a time. Callers beyond
//! that wait on a FIFO semaphore without timing out. Sessions are opened
//! lazily, reused after release, and discarded when the driver reports a
//! transport fault so a broken session never goes back to the idle set.
//!
//! Before an idle session is handed out again it must be younger than
//! `max_lifetime`, idle for less than `idle_timeout`, and (by default) answer a
//! ping. The server drops sessions that sit idle past its `wait_timeout`; those
//! fail the ping and are replaced by a fresh session.
//!
//! The pool is generic over a [`Connector`] so the same bookkeeping serves the
//! MySQL backend and the in-memory backend used by tests.

use crate::error::{GatewayError, GatewayResult};
use crate::models::{QueryData, Statement};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default number of concurrently leased sessions.
pub const DEFAULT_POOL_SIZE: usize = 10;
/// Default time a session may sit idle before it is closed instead of reused.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);
/// Default age after which a session is closed instead of reused.
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Pool sizing and session recycling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_size: usize,
    /// `None` keeps idle sessions indefinitely.
    pub idle_timeout: Option<Duration>,
    /// `None` lets sessions live indefinitely.
    pub max_lifetime: Option<Duration>,
    /// Ping an idle session before handing it out.
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_POOL_SIZE,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_lifetime: Some(DEFAULT_MAX_LIFETIME),
            test_before_acquire: true,
        }
    }
}

impl PoolConfig {
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }
}

/// One open database session.
pub trait Session: Send + 'static {
    /// Run a single statement and collect its full result.
    fn run(
        &mut self,
        statement: &Statement,
    ) -> impl Future<Output = Result<QueryData, sqlx::Error>> + Send;

    /// Check that the server still answers on this session.
    fn ping(&mut self) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Close the session gracefully.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens new sessions against one database.
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    fn connect(&self) -> impl Future<Output = Result<Self::Session, sqlx::Error>> + Send;

    /// Human-readable target used in logs, never containing credentials.
    fn target(&self) -> String;
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub max_size: usize,
    pub in_use: usize,
    pub idle: usize,
    pub waiting: usize,
}

/// A session waiting in the idle set.
struct IdleSession<S> {
    session: S,
    created_at: Instant,
    idle_since: Instant,
}

struct PoolInner<C: Connector> {
    connector: C,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<IdleSession<C::Session>>>,
    waiting: AtomicUsize,
}

impl<C: Connector> PoolInner<C> {
    fn take_idle(&self) -> Option<IdleSession<C::Session>> {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    fn return_idle(&self, session: C::Session, created_at: Instant) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(IdleSession {
                session,
                created_at,
                idle_since: Instant::now(),
            });
    }

    /// Why an idle session must be closed rather than reused, if it must.
    fn expiry(&self, idle: &IdleSession<C::Session>) -> Option<&'static str> {
        let now = Instant::now();
        if self
            .config
            .max_lifetime
            .is_some_and(|max| now.duration_since(idle.created_at) >= max)
        {
            return Some("max lifetime reached");
        }
        if self
            .config
            .idle_timeout
            .is_some_and(|max| now.duration_since(idle.idle_since) >= max)
        {
            return Some("idle timeout reached");
        }
        None
    }

    /// Reuse a healthy idle session or open a new one.
    async fn checkout(&self) -> GatewayResult<(C::Session, Instant)> {
        while let Some(idle) = self.take_idle() {
            if let Some(reason) = self.expiry(&idle) {
                debug!(reason, "Closing idle session");
                idle.session.close().await;
                continue;
            }

            let mut session = idle.session;
            if self.config.test_before_acquire {
                if let Err(e) = session.ping().await {
                    warn!(error = %e, "Idle session failed liveness check, replacing it");
                    continue;
                }
            }
            return Ok((session, idle.created_at));
        }

        let session = self.open_session().await?;
        Ok((session, Instant::now()))
    }

    async fn open_session(&self) -> GatewayResult<C::Session> {
        debug!(target_db = %self.connector.target(), "Opening new database session");
        self.connector.connect().await.map_err(|e| {
            GatewayError::connection(
                format!("Failed to connect: {}", e),
                connection_suggestion(&e),
            )
        })
    }
}

/// Decrements the waiting counter even if the acquiring future is dropped.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded pool of database sessions.
pub struct ConnectionPool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("target", &self.inner.connector.target())
            .field("status", &self.status())
            .finish()
    }
}

impl<C: Connector> ConnectionPool<C> {
    /// Create a pool with default recycling settings. No session is opened
    /// until the first acquire.
    pub fn new(connector: C, max_size: usize) -> GatewayResult<Self> {
        Self::with_config(connector, PoolConfig::with_max_size(max_size))
    }

    pub fn with_config(connector: C, config: PoolConfig) -> GatewayResult<Self> {
        if config.max_size == 0 {
            return Err(GatewayError::config("pool size must be at least 1"));
        }

        Ok(Self {
            inner: Arc::new(PoolInner {
                connector,
                config,
                permits: Arc::new(Semaphore::new(config.max_size)),
                idle: Mutex::new(Vec::with_capacity(config.max_size)),
                waiting: AtomicUsize::new(0),
            }),
        })
    }

    pub fn max_size(&self) -> usize {
        self.inner.config.max_size
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// Lease a session, waiting in FIFO order while the pool is saturated.
    ///
    /// If opening a new session fails, the slot is freed before the error is
    /// returned.
    pub async fn acquire(&self) -> GatewayResult<Lease<C>> {
        let permit = match Arc::clone(&self.inner.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(pool_closed()),
            Err(TryAcquireError::NoPermits) => {
                let waiting = self.inner.waiting.fetch_add(1, Ordering::SeqCst) + 1;
                let _waiting = WaitingGuard(&self.inner.waiting);
                debug!(
                    waiting,
                    max_size = self.inner.config.max_size,
                    "Pool saturated, waiting for a session"
                );
                Arc::clone(&self.inner.permits)
                    .acquire_owned()
                    .await
                    .map_err(|_| pool_closed())?
            }
        };

        let (session, created_at) = self.inner.checkout().await?;

        Ok(Lease {
            session: Some(session),
            created_at,
            pool: Arc::clone(&self.inner),
            discard: false,
            _permit: permit,
        })
    }

    /// Acquire and immediately release one session to verify connectivity.
    pub async fn probe(&self) -> GatewayResult<()> {
        let lease = self.acquire().await?;
        lease.release();
        info!(target_db = %self.inner.connector.target(), "Database connectivity verified");
        Ok(())
    }

    pub fn status(&self) -> PoolStatus {
        let idle = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let max_size = self.inner.config.max_size;
        PoolStatus {
            max_size,
            in_use: max_size - self.inner.permits.available_permits(),
            idle,
            waiting: self.inner.waiting.load(Ordering::SeqCst),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    /// Stop handing out sessions and close every idle one.
    ///
    /// Leases still held are dropped rather than returned when released.
    pub async fn close(&self) {
        self.inner.permits.close();
        let sessions: Vec<IdleSession<C::Session>> = std::mem::take(
            &mut *self
                .inner
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let count = sessions.len();
        for idle in sessions {
            idle.session.close().await;
        }
        info!(closed = count, "Connection pool closed");
    }
}

/// A leased session. Dropping the lease returns the session to the pool and
/// frees its slot.
pub struct Lease<C: Connector> {
    session: Option<C::Session>,
    created_at: Instant,
    pool: Arc<PoolInner<C>>,
    discard: bool,
    // Declared last so the session is back in the idle set before the slot frees.
    _permit: OwnedSemaphorePermit,
}

impl<C: Connector> std::fmt::Debug for Lease<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("created_at", &self.created_at)
            .field("discard", &self.discard)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Lease<C> {
    /// Run one statement on the leased session.
    pub async fn run(&mut self, statement: &Statement) -> Result<QueryData, sqlx::Error> {
        match self.session.as_mut() {
            Some(session) => session.run(statement).await,
            None => Err(sqlx::Error::PoolClosed),
        }
    }

    /// Return the session to the pool.
    pub fn release(self) {
        drop(self);
    }

    /// Drop the session instead of returning it, for sessions left in an
    /// unknown state by a transport fault.
    pub fn discard(mut self) {
        self.discard = true;
    }
}

impl<C: Connector> Drop for Lease<C> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        if self.discard {
            warn!("Discarding database session after transport fault");
        } else if self.pool.permits.is_closed() {
            debug!("Pool closed, dropping released session");
        } else {
            self.pool.return_idle(session, self.created_at);
        }
    }
}

fn pool_closed() -> GatewayError {
    GatewayError::connection("Connection pool is closed", "Restart the server")
}

/// Generate a helpful suggestion for connection errors.
pub(crate) fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the MySQL server is running and accessible".to_string();
    }

    if error_str.contains("access denied") || error_str.contains("password") {
        return "Verify the database user and password".to_string();
    }

    if error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("timed out") {
        return "Check the host and port, or raise the connect timeout".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    "Verify the connection settings: host, port, user, password and database".to_string()
}
