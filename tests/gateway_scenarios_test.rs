//! Integration tests for the tool surface.
//!
//! These tests drive the dispatcher end to end against the scripted in-memory
//! backend and check the JSON envelopes a client would receive.

use mysql_mcp_gateway::db::{ConnectionPool, MemoryConnector, Scripted};
use mysql_mcp_gateway::mcp::{ToolDispatcher, ToolInvocation};
use mysql_mcp_gateway::models::{CellValue, Row};
use mysql_mcp_gateway::tools::Policy;
use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};

/// Helper to setup a dispatcher over a scripted `shuwu` database.
fn setup_dispatcher(connector: &MemoryConnector, policy: Policy) -> ToolDispatcher<MemoryConnector> {
    let pool = ConnectionPool::new(connector.clone(), 4).expect("pool");
    ToolDispatcher::new(pool, policy, "shuwu")
}

fn users_rows() -> Vec<Row> {
    vec![
        Row::new().with("id", 1i64).with("name", "ada"),
        Row::new().with("id", 2i64).with("name", "grace"),
    ]
}

fn users_describe_rows() -> Vec<Row> {
    vec![
        Row::new()
            .with("Field", "id")
            .with("Type", "int unsigned")
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
    ]
}

async fn call(dispatcher: &ToolDispatcher<MemoryConnector>, tool: &str, args: Value) -> (Value, bool) {
    let response = dispatcher
        .dispatch(ToolInvocation::from_json(tool, args))
        .await;
    let body = assert_ok!(response.json());
    (body, response.is_error)
}

// =========================================================================
// Scenario A: read with leading whitespace runs
// =========================================================================

/// Leading whitespace and lower case still classify as a read.
#[tokio::test]
async fn test_select_with_leading_whitespace_runs() {
    let connector = MemoryConnector::new().on("select * from users", Scripted::rows(users_rows()));
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, is_error) = call(&dispatcher, "query", json!({ "sql": "  select * from users" })).await;

    assert!(!is_error);
    assert_eq!(body["success"], true);
    assert_eq!(body["rowCount"], 2);
    assert_eq!(body["data"][0], json!({ "id": 1, "name": "ada" }));
    assert_eq!(connector.executed(), vec!["  select * from users"]);
}

/// A read that matches nothing still returns an empty row list.
#[tokio::test]
async fn test_empty_select_returns_empty_rows() {
    let connector = MemoryConnector::new();
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, is_error) = call(&dispatcher, "query", json!({ "sql": "SELECT * FROM users WHERE 0" })).await;

    assert!(!is_error);
    assert_eq!(body["rowCount"], 0);
    assert_eq!(body["data"], json!([]));
}

// =========================================================================
// Scenario B: DDL denied without leasing a connection
// =========================================================================

#[tokio::test]
async fn test_drop_table_denied_without_connecting() {
    let connector = MemoryConnector::new();
    let dispatcher = setup_dispatcher(&connector, Policy::with_writes(true));

    let (body, is_error) = call(&dispatcher, "query", json!({ "sql": "DROP TABLE users" })).await;

    assert!(is_error);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("DDL"));
    assert_eq!(connector.connects(), 0);
    assert_eq!(dispatcher.pool().status().in_use, 0);
}

#[tokio::test]
async fn test_all_ddl_keywords_denied() {
    let connector = MemoryConnector::new();
    let dispatcher = setup_dispatcher(&connector, Policy::with_writes(true));

    for sql in [
        "create table t (id int)",
        "ALTER TABLE users ADD COLUMN x INT",
        "  truncate users",
    ] {
        let (_, is_error) = call(&dispatcher, "query", json!({ "sql": sql })).await;
        assert!(is_error, "expected {:?} to be denied", sql);
    }
    assert!(connector.executed().is_empty());
}

// =========================================================================
// Scenario C: writes follow the policy
// =========================================================================

#[tokio::test]
async fn test_delete_denied_when_writes_disabled() {
    let connector = MemoryConnector::new();
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, is_error) = call(&dispatcher, "query", json!({ "sql": "DELETE FROM users WHERE id = 1" })).await;

    assert!(is_error);
    assert_eq!(body["error"], "write operations are disabled");
    assert!(connector.executed().is_empty());
}

#[tokio::test]
async fn test_insert_allowed_when_writes_enabled() {
    let connector = MemoryConnector::new().on(
        "INSERT INTO users (name) VALUES ('linus')",
        Scripted::outcome(1, 3),
    );
    let dispatcher = setup_dispatcher(&connector, Policy::with_writes(true));

    let (body, is_error) = call(
        &dispatcher,
        "query",
        json!({ "sql": "INSERT INTO users (name) VALUES ('linus')" }),
    )
    .await;

    assert!(!is_error);
    assert_eq!(body["rowCount"], 0);
    assert_eq!(body["data"], json!({ "affectedRows": 1, "insertId": 3 }));
}

/// A batch that starts with a read cannot smuggle DDL or writes past the gate.
#[tokio::test]
async fn test_batches_denied_under_any_policy() {
    let strict = Policy {
        allow_write: false,
        deny_unclassified: true,
    };
    for policy in [Policy::read_only(), Policy::with_writes(true), strict] {
        let connector = MemoryConnector::new();
        let dispatcher = setup_dispatcher(&connector, policy);

        for sql in [
            "SELECT 1; DROP TABLE users",
            "SELECT 1; DELETE FROM users",
            "  show tables;\nTRUNCATE users",
        ] {
            let (body, is_error) = call(&dispatcher, "query", json!({ "sql": sql })).await;
            assert!(is_error, "expected {:?} to be denied", sql);
            assert_eq!(body["error"], "multiple statements are not permitted");
        }
        assert_eq!(connector.connects(), 0);
        assert!(connector.executed().is_empty());
    }
}

/// A trailing semicolon is still a single statement.
#[tokio::test]
async fn test_trailing_semicolon_runs() {
    let connector = MemoryConnector::new().on("SELECT * FROM users;", Scripted::rows(users_rows()));
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, is_error) = call(&dispatcher, "query", json!({ "sql": "SELECT * FROM users;" })).await;

    assert!(!is_error);
    assert_eq!(body["rowCount"], 2);
}

// =========================================================================
// Scenario D: missing arguments
// =========================================================================

#[tokio::test]
async fn test_describe_table_without_table_argument() {
    let connector = MemoryConnector::new();
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, is_error) = call(&dispatcher, "describe_table", json!({})).await;

    assert!(is_error);
    assert_eq!(body, json!({ "success": false, "error": "missing argument: table" }));
    assert_eq!(connector.connects(), 0);
}

// =========================================================================
// Scenario E: list_tables degrades on introspection failure
// =========================================================================

#[tokio::test]
async fn test_list_tables_degrades_to_empty() {
    let connector = MemoryConnector::new().on(
        "SHOW TABLES",
        Scripted::database_error("SHOW command denied to user", "42000"),
    );
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, is_error) = call(&dispatcher, "list_tables", json!({})).await;

    assert!(!is_error);
    assert_eq!(
        body,
        json!({ "success": true, "database": "shuwu", "tables": [], "count": 0 })
    );
}

#[tokio::test]
async fn test_list_tables_success() {
    let connector = MemoryConnector::new().on(
        "SHOW TABLES",
        Scripted::rows(vec![
            Row::new().with("Tables_in_shuwu", "orders"),
            Row::new().with("Tables_in_shuwu", "users"),
        ]),
    );
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, _) = call(&dispatcher, "list_tables", json!({})).await;
    assert_eq!(body["tables"], json!(["orders", "users"]));
    assert_eq!(body["count"], 2);
}

// =========================================================================
// Execution failures and resources
// =========================================================================

/// Server errors come back as failure envelopes carrying the driver message.
#[tokio::test]
async fn test_execution_error_envelope() {
    let connector = MemoryConnector::new().on(
        "SELECT * FROM missing",
        Scripted::database_error("Table 'shuwu.missing' doesn't exist", "42S02"),
    );
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, is_error) = call(&dispatcher, "query", json!({ "sql": "SELECT * FROM missing" })).await;

    assert!(is_error);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Table 'shuwu.missing' doesn't exist"));
    assert_eq!(dispatcher.pool().status().in_use, 0);
}

/// describe_table and the resource read agree on the schema.
#[tokio::test]
async fn test_describe_table_matches_resource_read() {
    let connector = MemoryConnector::new()
        .on("SHOW TABLES", Scripted::rows(vec![Row::new().with("Tables_in_shuwu", "users")]))
        .on("DESCRIBE `users`", Scripted::rows(users_describe_rows()));
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (described, is_error) = call(&dispatcher, "describe_table", json!({ "table": "users" })).await;
    assert!(!is_error);
    assert_eq!(described["table"], "users");
    assert_eq!(described["schema"][0]["Field"], "id");
    assert_eq!(described["schema"][1]["Null"], "YES");

    let resources = dispatcher.list_resources().await;
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].uri, "mysql:///shuwu/users");

    let document = assert_ok!(dispatcher.read_resource(&resources[0].uri).await);
    assert_eq!(document.mime_type, "application/json");
    let read: Value = serde_json::from_str(&document.text).unwrap();
    assert_eq!(read["table"], "users");
    assert_eq!(read["schema"], described["schema"]);
}

#[tokio::test]
async fn test_read_resource_for_other_database_fails() {
    let connector = MemoryConnector::new();
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    assert_err!(dispatcher.read_resource("mysql:///information_schema/tables").await);
    assert!(connector.executed().is_empty());
}

#[tokio::test]
async fn test_unavailable_database_yields_failure_envelope() {
    let connector = MemoryConnector::new();
    connector.set_fail_connect(true);
    let dispatcher = setup_dispatcher(&connector, Policy::read_only());

    let (body, is_error) = call(&dispatcher, "query", json!({ "sql": "SELECT 1" })).await;

    assert!(is_error);
    assert!(body["error"].as_str().unwrap().starts_with("Connection failed"));
    assert_eq!(dispatcher.pool().status().in_use, 0);
}
