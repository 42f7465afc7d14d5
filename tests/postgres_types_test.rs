//! Integration tests for PostgreSQL value serialization.
//!
//! Requires a running PostgreSQL server. Set TEST_PG_HOST (and optionally
//! TEST_PG_PORT, TEST_PG_USER, TEST_PG_PASSWORD, TEST_PG_DATABASE) to run.

use serde_json::{Value, json};
use sql_agent_mcp::db::ConnectionManager;
use sql_agent_mcp::models::{Credentials, DatabaseType};
use sql_agent_mcp::tools::QueryToolHandler;
use std::sync::Arc;

fn postgres_credentials() -> Option<Credentials> {
    let host = std::env::var("TEST_PG_HOST").ok()?;
    let mut creds = Credentials::new(DatabaseType::PostgreSQL).with_host(host);
    if let Some(port) = std::env::var("TEST_PG_PORT").ok().and_then(|p| p.parse().ok()) {
        creds = creds.with_port(port);
    }
    if let Ok(user) = std::env::var("TEST_PG_USER") {
        creds = creds.with_user(user);
    }
    if let Ok(password) = std::env::var("TEST_PG_PASSWORD") {
        creds = creds.with_password(password);
    }
    if let Ok(database) = std::env::var("TEST_PG_DATABASE") {
        creds = creds.with_database(database);
    }
    Some(creds)
}

#[tokio::test]
async fn test_postgres_native_types() {
    let Some(creds) = postgres_credentials() else {
        eprintln!("Skipping test: TEST_PG_HOST not set");
        return;
    };

    let handler = QueryToolHandler::new(Arc::new(ConnectionManager::new(creds)));
    let text = handler
        .run(
            "SELECT 12.50::numeric(10,2) AS price, \
             TIMESTAMPTZ '2024-03-05 10:11:12+00' AS sold_at, \
             DATE '2024-03-05' AS sold_on, \
             true AS active, \
             '{\"a\": 1}'::jsonb AS doc, \
             'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid AS id, \
             INTERVAL '1 day' AS span, \
             26::oid AS type_oid",
        )
        .await
        .unwrap();
    let envelope: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(
        envelope["metadata"]["columns"],
        json!([
            {"name": "price", "type": "Decimal"},
            {"name": "sold_at", "type": "datetime"},
            {"name": "sold_on", "type": "date"},
            {"name": "active", "type": "bool"},
            {"name": "doc", "type": "json"},
            {"name": "id", "type": "uuid"},
            {"name": "span", "type": "interval"},
            {"name": "type_oid", "type": "int"}
        ])
    );

    let row = &envelope["results"][0];
    assert!((row["price"].as_f64().unwrap() - 12.5).abs() < 1e-9);
    assert_eq!(row["sold_at"], "2024-03-05T10:11:12+00:00");
    assert_eq!(row["sold_on"], "2024-03-05");
    assert_eq!(row["active"], true);
    assert_eq!(row["doc"], r#"{"a":1}"#);
    assert_eq!(row["id"], "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11");
    assert_eq!(row["span"], "1 day");
    assert_eq!(row["type_oid"], 26);
}

#[tokio::test]
async fn test_postgres_error_keeps_message() {
    let Some(creds) = postgres_credentials() else {
        eprintln!("Skipping test: TEST_PG_HOST not set");
        return;
    };

    let handler = QueryToolHandler::new(Arc::new(ConnectionManager::new(creds)));
    let err = handler
        .run("SELECT * FROM fct_table_that_does_not_exist")
        .await
        .unwrap_err();
    match err {
        sql_agent_mcp::DbError::Database { sql_state, .. } => {
            assert_eq!(sql_state.as_deref(), Some("42P01"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
