//! Schema introspection tools.
//!
//! This module implements the `list_tables` and `describe_table` MCP tools.

use crate::db::{Catalog, Connector};
use crate::error::GatewayResult;
use crate::models::TableSchema;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::info;

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, JsonSchema)]
pub struct ListTablesInput {}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize)]
pub struct ListTablesOutput {
    pub success: bool,
    /// Configured database name
    pub database: String,
    pub tables: Vec<String>,
    pub count: usize,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, JsonSchema)]
pub struct DescribeTableInput {
    /// Name of the table to describe
    pub table: String,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize)]
pub struct DescribeTableOutput {
    pub success: bool,
    pub table: String,
    pub schema: TableSchema,
}

/// Handler for schema tools.
pub struct SchemaToolHandler<C: Connector> {
    catalog: Catalog<C>,
}

impl<C: Connector> SchemaToolHandler<C> {
    pub fn new(catalog: Catalog<C>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog<C> {
        &self.catalog
    }

    /// List tables of the configured database. Introspection failures degrade
    /// to an empty list.
    pub async fn list_tables(&self, _input: ListTablesInput) -> ListTablesOutput {
        let tables = self.catalog.list_tables().await;
        info!(count = tables.len(), "Listed tables");

        ListTablesOutput {
            success: true,
            database: self.catalog.database().to_string(),
            count: tables.len(),
            tables,
        }
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> GatewayResult<DescribeTableOutput> {
        let schema = self.catalog.get_schema(&input.table).await?;
        info!(table = %input.table, columns = schema.len(), "Described table");

        Ok(DescribeTableOutput {
            success: true,
            table: input.table,
            schema,
        })
    }
}
