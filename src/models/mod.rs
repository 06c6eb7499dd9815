//! Data models for the MySQL MCP gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod resource;
pub mod schema;
pub mod statement;
pub mod value;

// Re-export commonly used types
pub use query::{ExecOutcome, QueryData, QueryResult};
pub use resource::{RESOURCE_MIME_TYPE, RESOURCE_SCHEME, ResourceUri};
pub use schema::{ColumnDescriptor, TableSchema};
pub use statement::{Statement, StatementKind};
pub use value::{CellValue, Row};
