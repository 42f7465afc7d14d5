//! Loading settings from a `.env` file.
//!
//! Kept in its own test binary: loading the file changes the process
//! environment.

use clap::Parser;
use sql_agent_mcp::config::{Config, load_env_file};
use sql_agent_mcp::models::DatabaseType;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_env_file_values_reach_config() {
    let dir = TempDir::new().unwrap();
    let env_path = dir.path().join(".env");
    std::fs::write(
        &env_path,
        "DB_BACKEND=sqlite\nDB_HOST=/data/retail.db\nCATALOG_PATH=/data/catalog.json\n",
    )
    .unwrap();

    assert_eq!(load_env_file(Some(&env_path)), Some(env_path.clone()));

    let config = Config::try_parse_from(["sql-agent-mcp"]).unwrap();
    assert_eq!(config.backend, DatabaseType::SQLite);
    assert_eq!(config.host.as_deref(), Some("/data/retail.db"));
    assert_eq!(config.catalog_path, Some(PathBuf::from("/data/catalog.json")));

    // Flags still take precedence over the file
    let config =
        Config::try_parse_from(["sql-agent-mcp", "--host", "/tmp/other.db"]).unwrap();
    assert_eq!(config.host.as_deref(), Some("/tmp/other.db"));

    assert_eq!(load_env_file(Some(&dir.path().join("missing.env"))), None);
}
