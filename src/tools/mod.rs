//! MCP tool implementations.
//!
//! This module contains the gate and the tool handlers:
//! - `classifier`: leading-keyword statement classification
//! - `policy`: allow/deny decision per statement kind
//! - `query`: execute one SQL statement through the gate
//! - `list_tables`: list tables in the configured database
//! - `describe_table`: get the column layout of one table

pub mod classifier;
pub mod policy;
pub mod query;
pub mod schema;

pub use policy::{Decision, Policy};
pub use query::{QueryInput, QueryToolHandler};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListTablesInput, ListTablesOutput, SchemaToolHandler,
};

use schemars::JsonSchema;
use serde_json::{Map, Value};

/// The tools exposed over MCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    Query,
    ListTables,
    DescribeTable,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [Self::Query, Self::ListTables, Self::DescribeTable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::ListTables => "list_tables",
            Self::DescribeTable => "describe_table",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Query => {
                "Execute a SQL statement against the configured MySQL database. \
                 SELECT/SHOW/DESCRIBE are always allowed; INSERT/UPDATE/DELETE only when \
                 writes are enabled; CREATE/DROP/ALTER/TRUNCATE are always rejected."
            }
            Self::ListTables => "List all tables in the configured database.",
            Self::DescribeTable => {
                "Describe the columns of a table: field, type, nullability, key, default and extra."
            }
        }
    }

    /// JSON schema of the tool's arguments.
    pub fn input_schema(&self) -> Map<String, Value> {
        match self {
            Self::Query => schema_object::<QueryInput>(),
            Self::ListTables => schema_object::<ListTablesInput>(),
            Self::DescribeTable => schema_object::<DescribeTableInput>(),
        }
    }
}

fn schema_object<T: JsonSchema>() -> Map<String, Value> {
    schemars::schema_for!(T)
        .as_object()
        .cloned()
        .unwrap_or_default()
}
