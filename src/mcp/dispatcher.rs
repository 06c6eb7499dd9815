//! Protocol-independent tool dispatch.
//!
//! The dispatcher routes a tool call by name, validates its arguments, runs
//! the handler and wraps the outcome in a JSON envelope. Every per-call error
//! ends here as `{"success": false, "error": ...}`; nothing below this point
//! reaches the transport.

use crate::db::{Catalog, ConnectionPool, Connector, QueryExecutor};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{RESOURCE_MIME_TYPE, ResourceUri, TableSchema};
use crate::tools::{
    DescribeTableInput, ListTablesInput, Policy, QueryInput, QueryToolHandler, SchemaToolHandler,
    ToolName,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// One tool call as received from the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Build an invocation from a JSON value. Anything but an object is
    /// treated as no arguments.
    pub fn from_json(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(name, arguments)
    }

    /// Required string argument. Absent, null and empty strings count as missing.
    fn required_str(&self, key: &str) -> GatewayResult<String> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Err(GatewayError::missing_argument(key)),
            Some(Value::String(s)) if s.is_empty() => Err(GatewayError::missing_argument(key)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(GatewayError::validation(format!(
                "invalid argument: {} must be a string",
                key
            ))),
        }
    }
}

/// Envelope text returned for a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    /// Pretty-printed JSON envelope
    pub content_text: String,
    pub is_error: bool,
}

#[derive(Serialize)]
struct FailureEnvelope<'a> {
    success: bool,
    error: &'a str,
}

impl ToolResponse {
    fn success<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(content_text) => Self {
                content_text,
                is_error: false,
            },
            Err(e) => Self::failure(&GatewayError::internal(format!(
                "failed to encode response: {}",
                e
            ))),
        }
    }

    fn failure(err: &GatewayError) -> Self {
        let message = err.to_string();
        let envelope = FailureEnvelope {
            success: false,
            error: &message,
        };
        let content_text = serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| {
            format!(
                r#"{{"success": false, "error": {}}}"#,
                Value::String(message.clone())
            )
        });
        Self {
            content_text,
            is_error: true,
        }
    }

    /// Parse the envelope back into JSON.
    pub fn json(&self) -> GatewayResult<Value> {
        serde_json::from_str(&self.content_text)
            .map_err(|e| GatewayError::internal(format!("invalid envelope: {}", e)))
    }
}

/// A table offered through the resource protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Contents of a table resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDocument {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

#[derive(Serialize)]
struct TableDocument<'a> {
    table: &'a str,
    schema: &'a TableSchema,
}

/// Routes tool calls and resource requests to their handlers.
pub struct ToolDispatcher<C: Connector> {
    query: QueryToolHandler<C>,
    schema: SchemaToolHandler<C>,
    pool: ConnectionPool<C>,
}

impl<C: Connector> ToolDispatcher<C> {
    pub fn new(pool: ConnectionPool<C>, policy: Policy, database: impl Into<String>) -> Self {
        let executor = QueryExecutor::new(pool.clone());
        Self {
            query: QueryToolHandler::new(executor.clone(), policy),
            schema: SchemaToolHandler::new(Catalog::new(executor, database)),
            pool,
        }
    }

    pub fn database(&self) -> &str {
        self.schema.catalog().database()
    }

    pub fn policy(&self) -> Policy {
        self.query.policy()
    }

    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    /// Handle one tool call. Never fails; errors become failure envelopes.
    pub async fn dispatch(&self, invocation: ToolInvocation) -> ToolResponse {
        debug!(tool = %invocation.name, "Dispatching tool call");
        match self.route(&invocation).await {
            Ok(response) => {
                info!(tool = %invocation.name, "Tool call succeeded");
                response
            }
            Err(err) => {
                warn!(tool = %invocation.name, error = %err, "Tool call failed");
                ToolResponse::failure(&err)
            }
        }
    }

    async fn route(&self, invocation: &ToolInvocation) -> GatewayResult<ToolResponse> {
        let Some(tool) = ToolName::parse(&invocation.name) else {
            return Err(GatewayError::validation(format!(
                "unknown tool: {}",
                invocation.name
            )));
        };

        match tool {
            ToolName::Query => {
                let sql = invocation.required_str("sql")?;
                let result = self.query.query(QueryInput { sql }).await?;
                Ok(ToolResponse::success(&result))
            }
            ToolName::ListTables => {
                let output = self.schema.list_tables(ListTablesInput {}).await;
                Ok(ToolResponse::success(&output))
            }
            ToolName::DescribeTable => {
                let table = invocation.required_str("table")?;
                let output = self
                    .schema
                    .describe_table(DescribeTableInput { table })
                    .await?;
                Ok(ToolResponse::success(&output))
            }
        }
    }

    /// One resource per table of the configured database.
    pub async fn list_resources(&self) -> Vec<TableResource> {
        let database = self.database();
        self.schema
            .catalog()
            .list_tables()
            .await
            .into_iter()
            .map(|table| TableResource {
                uri: ResourceUri::new(database, table.as_str()).to_string(),
                description: format!("Table: {}", table),
                mime_type: RESOURCE_MIME_TYPE.to_string(),
                name: table,
            })
            .collect()
    }

    /// Read a table resource as `{"table": ..., "schema": [...]}`.
    ///
    /// Unlike tool calls, failures are returned to the caller so the transport
    /// can report them as protocol errors.
    pub async fn read_resource(&self, uri: &str) -> GatewayResult<ResourceDocument> {
        let target = ResourceUri::parse(uri)?;
        if target.database != self.database() {
            return Err(GatewayError::validation(format!(
                "unknown database: {}",
                target.database
            )));
        }

        let schema = self.schema.catalog().get_schema(&target.table).await?;
        let text = serde_json::to_string_pretty(&TableDocument {
            table: &target.table,
            schema: &schema,
        })
        .map_err(|e| GatewayError::internal(format!("failed to encode resource: {}", e)))?;

        Ok(ResourceDocument {
            uri: uri.to_string(),
            mime_type: RESOURCE_MIME_TYPE.to_string(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryConnector, Scripted};
    use crate::models::Row;
    use serde_json::json;

    fn dispatcher(connector: &MemoryConnector) -> ToolDispatcher<MemoryConnector> {
        let pool = ConnectionPool::new(connector.clone(), 2).unwrap();
        ToolDispatcher::new(pool, Policy::read_only(), "shuwu")
    }

    fn call(name: &str, arguments: Value) -> ToolInvocation {
        ToolInvocation::from_json(name, arguments)
    }

    #[test]
    fn test_failure_envelope_shape() {
        let response = ToolResponse::failure(&GatewayError::missing_argument("sql"));
        assert!(response.is_error);
        assert_eq!(
            response.json().unwrap(),
            json!({ "success": false, "error": "missing argument: sql" })
        );
    }

    #[test]
    fn test_from_json_ignores_non_objects() {
        let invocation = ToolInvocation::from_json("query", json!(["SELECT 1"]));
        assert!(invocation.arguments.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let connector = MemoryConnector::new();
        let response = dispatcher(&connector).dispatch(call("drop_everything", json!({}))).await;
        assert!(response.is_error);
        assert_eq!(response.json().unwrap()["error"], "unknown tool: drop_everything");
    }

    #[tokio::test]
    async fn test_missing_and_empty_sql() {
        let connector = MemoryConnector::new();
        let dispatcher = dispatcher(&connector);

        for args in [json!({}), json!({ "sql": null }), json!({ "sql": "" })] {
            let response = dispatcher.dispatch(call("query", args)).await;
            assert!(response.is_error);
            assert_eq!(response.json().unwrap()["error"], "missing argument: sql");
        }
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test]
    async fn test_non_string_argument() {
        let connector = MemoryConnector::new();
        let response = dispatcher(&connector)
            .dispatch(call("describe_table", json!({ "table": 42 })))
            .await;
        assert!(response.is_error);
        assert_eq!(
            response.json().unwrap()["error"],
            "invalid argument: table must be a string"
        );
    }

    #[tokio::test]
    async fn test_successful_query_envelope() {
        let connector = MemoryConnector::new().on(
            "SELECT id, name FROM users",
            Scripted::rows(vec![Row::new().with("id", 1i64).with("name", "ada")]),
        );
        let response = dispatcher(&connector)
            .dispatch(call("query", json!({ "sql": "SELECT id, name FROM users" })))
            .await;

        assert!(!response.is_error);
        assert_eq!(
            response.json().unwrap(),
            json!({ "success": true, "rowCount": 1, "data": [{ "id": 1, "name": "ada" }] })
        );
    }

    #[tokio::test]
    async fn test_list_resources() {
        let connector = MemoryConnector::new().on(
            "SHOW TABLES",
            Scripted::rows(vec![Row::new().with("Tables_in_shuwu", "users")]),
        );
        let resources = dispatcher(&connector).list_resources().await;
        assert_eq!(
            resources,
            vec![TableResource {
                uri: "mysql:///shuwu/users".to_string(),
                name: "users".to_string(),
                description: "Table: users".to_string(),
                mime_type: "application/json".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_read_resource_rejects_other_database() {
        let connector = MemoryConnector::new();
        let err = dispatcher(&connector)
            .read_resource("mysql:///other/users")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
        assert!(connector.executed().is_empty());
    }

    #[tokio::test]
    async fn test_read_resource_rejects_malformed_uri() {
        let connector = MemoryConnector::new();
        let err = dispatcher(&connector)
            .read_resource("file:///etc/passwd")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
    }
}
