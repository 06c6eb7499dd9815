//! Database access layer.
//!
//! This module provides database access functionality:
//! - Bounded session pool, generic over a connector
//! - MySQL backend, plus a scripted in-memory backend for tests
//! - Statement execution
//! - Catalog introspection
//! - Type mappings

pub mod catalog;
pub mod executor;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod mysql;
pub mod pool;
pub mod types;

pub use catalog::Catalog;
pub use executor::QueryExecutor;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryConnector, Scripted};
pub use mysql::MySqlConnector;
pub use pool::{ConnectionPool, Connector, Lease, PoolConfig, PoolStatus, Session};
