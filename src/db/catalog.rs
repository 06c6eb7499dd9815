//! Catalog introspection for the configured database.

use crate::db::executor::QueryExecutor;
use crate::db::pool::Connector;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{CellValue, ColumnDescriptor, Statement, TableSchema};
use tracing::{debug, error};

const LIST_TABLES_SQL: &str = "SHOW TABLES";

/// Lists tables and describes their columns through the shared executor.
pub struct Catalog<C: Connector> {
    executor: QueryExecutor<C>,
    database: String,
}

impl<C: Connector> Clone for Catalog<C> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            database: self.database.clone(),
        }
    }
}

impl<C: Connector> Catalog<C> {
    pub fn new(executor: QueryExecutor<C>, database: impl Into<String>) -> Self {
        Self {
            executor,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Names of the tables in the configured database, in server order.
    ///
    /// Never fails: errors are logged and reported as an empty list.
    pub async fn list_tables(&self) -> Vec<String> {
        match self.try_list_tables().await {
            Ok(tables) => {
                debug!(count = tables.len(), "Listed tables");
                tables
            }
            Err(e) => {
                error!(database = %self.database, error = %e, "Failed to list tables");
                Vec::new()
            }
        }
    }

    async fn try_list_tables(&self) -> GatewayResult<Vec<String>> {
        let result = self.executor.execute(&Statement::new(LIST_TABLES_SQL)).await?;
        let key = format!("Tables_in_{}", self.database);

        let rows = result.data.into_rows().unwrap_or_default();
        Ok(rows
            .iter()
            .filter_map(|row| {
                row.get_ignore_case(&key)
                    .or_else(|| row.first())
                    .and_then(CellValue::as_text)
            })
            .collect())
    }

    /// Column descriptors of `table`, in the server's order.
    pub async fn get_schema(&self, table: &str) -> GatewayResult<TableSchema> {
        let sql = format!("DESCRIBE {}", quote_identifier(table)?);

        let result = match self.executor.execute(&Statement::new(sql)).await {
            Ok(result) => result,
            Err(e) => {
                error!(table = %table, error = %e, "Failed to describe table");
                return Err(e);
            }
        };

        result
            .data
            .rows()
            .unwrap_or_default()
            .iter()
            .map(ColumnDescriptor::from_describe_row)
            .collect()
    }
}

/// Quote a table name as a MySQL identifier, doubling embedded back-ticks.
pub fn quote_identifier(name: &str) -> GatewayResult<String> {
    if name.is_empty() {
        return Err(GatewayError::validation("table name must not be empty"));
    }
    if name.contains('\0') {
        return Err(GatewayError::validation(
            "table name must not contain NUL characters",
        ));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryConnector, Scripted};
    use crate::db::pool::ConnectionPool;
    use crate::models::Row;

    fn catalog(connector: &MemoryConnector) -> Catalog<MemoryConnector> {
        let pool = ConnectionPool::new(connector.clone(), 2).unwrap();
        Catalog::new(QueryExecutor::new(pool), "shuwu")
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users").unwrap(), "`users`");
        assert_eq!(quote_identifier("we`ird").unwrap(), "`we``ird`");
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("a\0b").is_err());
    }

    #[tokio::test]
    async fn test_list_tables_reads_named_column() {
        let connector = MemoryConnector::new().on(
            "SHOW TABLES",
            Scripted::rows(vec![
                Row::new().with("Tables_in_shuwu", "orders"),
                Row::new().with("Tables_in_shuwu", "users"),
            ]),
        );
        assert_eq!(catalog(&connector).list_tables().await, vec!["orders", "users"]);
    }

    #[tokio::test]
    async fn test_list_tables_falls_back_to_first_column() {
        let connector = MemoryConnector::new().on(
            "SHOW TABLES",
            Scripted::rows(vec![Row::new().with("Tables_in_other", "t1")]),
        );
        assert_eq!(catalog(&connector).list_tables().await, vec!["t1"]);
    }

    #[tokio::test]
    async fn test_list_tables_swallows_errors() {
        let connector = MemoryConnector::new().on(
            "SHOW TABLES",
            Scripted::database_error("Access denied", "42000"),
        );
        assert!(catalog(&connector).list_tables().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_schema_quotes_the_table_name() {
        let connector = MemoryConnector::new().on(
            "DESCRIBE `users`",
            Scripted::rows(vec![
                Row::new()
                    .with("Field", "id")
                    .with("Type", "int")
                    .with("Null", "NO")
                    .with("Key", "PRI")
                    .with("Default", CellValue::Null)
                    .with("Extra", "auto_increment"),
                Row::new()
                    .with("Field", "name")
                    .with("Type", "varchar(64)")
                    .with("Null", "YES")
                    .with("Key", "")
                    .with("Default", CellValue::Null)
                    .with("Extra", ""),
            ]),
        );

        let schema = catalog(&connector).get_schema("users").await.unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].name(), "id");
        assert!(schema[0].is_primary_key());
        assert_eq!(schema[1].name(), "name");
        assert!(schema[1].is_nullable());
        assert_eq!(connector.executed(), vec!["DESCRIBE `users`"]);
    }

    #[tokio::test]
    async fn test_get_schema_propagates_errors() {
        let connector = MemoryConnector::new().on(
            "DESCRIBE `nope`",
            Scripted::database_error("Table 'shuwu.nope' doesn't exist", "42S02"),
        );
        let err = catalog(&connector).get_schema("nope").await.unwrap_err();
        assert!(matches!(err, GatewayError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_get_schema_rejects_empty_name() {
        let connector = MemoryConnector::new();
        let err = catalog(&connector).get_schema("").await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
        assert!(connector.executed().is_empty());
    }
}
