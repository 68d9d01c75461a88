//! SQLite tools: connect, query, command, schema inspection.
//!
//! rusqlite's connection API is synchronous, so every tool runs its database
//! work on the blocking thread pool. The `timeout` parameter maps to the
//! connection busy-timeout, the same knob the catalogue advertises.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::json;

use super::base::Tool;

const DEFAULT_ROW_LIMIT: u64 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn str_arg<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

fn u64_arg(params: &HashMap<String, serde_json::Value>, key: &str, default: u64) -> u64 {
    params.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
}

fn open_with_timeout(database_path: &str, timeout_secs: u64) -> Result<Connection, String> {
    let conn = Connection::open(database_path)
        .map_err(|e| format!("SQLite error connecting to database: {}", e))?;
    conn.busy_timeout(Duration::from_secs(timeout_secs))
        .map_err(|e| format!("SQLite error setting timeout: {}", e))?;
    Ok(conn)
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => json!(String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => json!(format!("<blob {} bytes>", b.len())),
    }
}

/// Run `f` on the blocking pool, flattening a join failure into the tool's
/// string-error convention.
async fn run_blocking<F>(f: F) -> String
where
    F: FnOnce() -> String + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(out) => out,
        Err(e) => format!("Error: database task failed: {}", e),
    }
}

// ---------------------------------------------------------------------------
// SqliteConnectTool
// ---------------------------------------------------------------------------

/// Verify a database file can be opened, reporting version and table count.
pub struct SqliteConnectTool;

#[async_trait]
impl Tool for SqliteConnectTool {
    fn name(&self) -> &str {
        "sqlite_connect"
    }

    fn description(&self) -> &str {
        "Connect to a SQLite database file and verify the connection"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "database_path": {
                    "type": "string",
                    "description": "Path to the SQLite database file"
                }
            },
            "required": ["database_path"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message with basic database info, or error message if connection fails"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let database_path = match str_arg(&params, "database_path") {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return "Error: Database path cannot be empty".to_string(),
        };

        run_blocking(move || {
            let file_exists = Path::new(&database_path).exists();

            let conn = match open_with_timeout(&database_path, DEFAULT_TIMEOUT_SECS) {
                Ok(c) => c,
                Err(e) => return format!("Error: {}", e),
            };

            let version: String = match conn.query_row("SELECT sqlite_version()", [], |row| {
                row.get(0)
            }) {
                Ok(v) => v,
                Err(e) => return format!("Error: SQLite error connecting to database: {}", e),
            };

            let table_count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                    [],
                    |row| row.get(0),
                )
                .unwrap_or(0);

            let status = if file_exists {
                "Connected to existing database"
            } else {
                "Created new database"
            };
            format!(
                "{}: {}\nSQLite version: {}\nTables found: {}",
                status, database_path, version, table_count
            )
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// SqliteExecuteQueryTool
// ---------------------------------------------------------------------------

/// Read-only SELECT execution with a row limit.
pub struct SqliteExecuteQueryTool;

#[async_trait]
impl Tool for SqliteExecuteQueryTool {
    fn name(&self) -> &str {
        "sqlite_execute_query"
    }

    fn description(&self) -> &str {
        "Execute a SELECT query on SQLite database (read-only operations)"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "database_path": {
                    "type": "string",
                    "description": "Path to the SQLite database file"
                },
                "query": {
                    "type": "string",
                    "description": "SQL SELECT query to execute"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of rows to return (defaults to 1000)"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Query timeout in seconds (defaults to 30)"
                }
            },
            "required": ["database_path", "query"]
        })
    }

    fn returns(&self) -> &str {
        "String - JSON formatted results with columns and rows, or error message if execution fails"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let database_path = match str_arg(&params, "database_path") {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return "Error: Database path and query cannot be empty".to_string(),
        };
        let query = match str_arg(&params, "query") {
            Some(q) if !q.is_empty() => q.to_string(),
            _ => return "Error: Database path and query cannot be empty".to_string(),
        };
        let limit = u64_arg(&params, "limit", DEFAULT_ROW_LIMIT);
        let timeout = u64_arg(&params, "timeout", DEFAULT_TIMEOUT_SECS);

        run_blocking(move || {
            if !Path::new(&database_path).is_file() {
                return format!("Error: Database file not found: {}", database_path);
            }

            let query_upper = query.trim().to_uppercase();
            if !query_upper.starts_with("SELECT") {
                return "Error: Only SELECT queries are allowed. Use sqlite_execute_command for other operations.".to_string();
            }

            let effective_query = if query_upper.contains("LIMIT") {
                query.clone()
            } else {
                format!("{} LIMIT {}", query.trim_end().trim_end_matches(';'), limit)
            };

            let conn = match open_with_timeout(&database_path, timeout) {
                Ok(c) => c,
                Err(e) => return format!("Error: {}", e),
            };

            let mut stmt = match conn.prepare(&effective_query) {
                Ok(s) => s,
                Err(e) => return format!("Error: SQLite error executing query: {}", e),
            };
            let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

            let mut rows = match stmt.query([]) {
                Ok(r) => r,
                Err(e) => return format!("Error: SQLite error executing query: {}", e),
            };

            let mut data = Vec::new();
            loop {
                match rows.next() {
                    Ok(Some(row)) => {
                        let mut obj = serde_json::Map::new();
                        for (idx, col) in columns.iter().enumerate() {
                            let value = row
                                .get_ref(idx)
                                .map(value_to_json)
                                .unwrap_or(serde_json::Value::Null);
                            obj.insert(col.clone(), value);
                        }
                        data.push(serde_json::Value::Object(obj));
                    }
                    Ok(None) => break,
                    Err(e) => return format!("Error: SQLite error executing query: {}", e),
                }
            }

            serde_json::to_string_pretty(&json!({
                "success": true,
                "columns": columns,
                "row_count": data.len(),
                "data": data,
            }))
            .unwrap_or_else(|e| format!("Error formatting results: {}", e))
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// SqliteExecuteCommandTool
// ---------------------------------------------------------------------------

/// INSERT/UPDATE/DELETE/DDL execution.
pub struct SqliteExecuteCommandTool;

#[async_trait]
impl Tool for SqliteExecuteCommandTool {
    fn name(&self) -> &str {
        "sqlite_execute_command"
    }

    fn description(&self) -> &str {
        "Execute INSERT, UPDATE, DELETE, or DDL commands on SQLite database"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "database_path": {
                    "type": "string",
                    "description": "Path to the SQLite database file"
                },
                "command": {
                    "type": "string",
                    "description": "SQL command to execute (INSERT, UPDATE, DELETE, CREATE, DROP, etc.)"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Command timeout in seconds (defaults to 30)"
                }
            },
            "required": ["database_path", "command"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message with affected rows count, or error message if execution fails"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let database_path = match str_arg(&params, "database_path") {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return "Error: Database path and command cannot be empty".to_string(),
        };
        let command = match str_arg(&params, "command") {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => return "Error: Database path and command cannot be empty".to_string(),
        };
        let timeout = u64_arg(&params, "timeout", DEFAULT_TIMEOUT_SECS);

        run_blocking(move || {
            if !Path::new(&database_path).is_file() {
                return format!("Error: Database file not found: {}", database_path);
            }

            if command.trim().to_uppercase().starts_with("SELECT") {
                return "Error: Use sqlite_execute_query for SELECT statements.".to_string();
            }

            let conn = match open_with_timeout(&database_path, timeout) {
                Ok(c) => c,
                Err(e) => return format!("Error: {}", e),
            };

            match conn.execute(&command, []) {
                Ok(rows_affected) => format!(
                    "Command executed successfully. Rows affected: {}",
                    rows_affected
                ),
                Err(e) => format!("Error: SQLite error executing command: {}", e),
            }
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// SqliteGetSchemaTool
// ---------------------------------------------------------------------------

/// Full schema dump: tables, views, columns.
pub struct SqliteGetSchemaTool;

#[async_trait]
impl Tool for SqliteGetSchemaTool {
    fn name(&self) -> &str {
        "sqlite_get_schema"
    }

    fn description(&self) -> &str {
        "Get the complete database schema including all tables, columns, and their types"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "database_path": {
                    "type": "string",
                    "description": "Path to the SQLite database file"
                }
            },
            "required": ["database_path"]
        })
    }

    fn returns(&self) -> &str {
        "String - JSON formatted schema information, or error message if retrieval fails"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let database_path = match str_arg(&params, "database_path") {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return "Error: Database path cannot be empty".to_string(),
        };

        run_blocking(move || {
            if !Path::new(&database_path).is_file() {
                return format!("Error: Database file not found: {}", database_path);
            }

            let conn = match open_with_timeout(&database_path, DEFAULT_TIMEOUT_SECS) {
                Ok(c) => c,
                Err(e) => return format!("Error: {}", e),
            };

            let objects = match list_master_objects(&conn) {
                Ok(o) => o,
                Err(e) => return format!("Error: SQLite error getting schema: {}", e),
            };

            let mut tables = Vec::new();
            let mut views = Vec::new();
            for (name, obj_type, create_sql) in objects {
                let columns = match table_columns(&conn, &name) {
                    Ok(c) => c,
                    Err(e) => return format!("Error: SQLite error getting schema: {}", e),
                };
                let info = json!({
                    "name": name,
                    "columns": columns,
                    "create_sql": create_sql,
                });
                if obj_type == "table" {
                    tables.push(info);
                } else {
                    views.push(info);
                }
            }

            serde_json::to_string_pretty(&json!({
                "database": database_path,
                "tables": tables,
                "views": views,
            }))
            .unwrap_or_else(|e| format!("Error formatting schema: {}", e))
        })
        .await
    }
}

/// (name, type, create_sql) for every table and view, ordered by type then name.
fn list_master_objects(
    conn: &Connection,
) -> rusqlite::Result<Vec<(String, String, Option<String>)>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, sql FROM sqlite_master \
         WHERE type IN ('table', 'view') ORDER BY type, name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;
    rows.collect()
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<serde_json::Value>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| {
        Ok(json!({
            "name": row.get::<_, String>(1)?,
            "type": row.get::<_, String>(2)?,
            "not_null": row.get::<_, bool>(3)?,
            "default_value": row.get::<_, Option<String>>(4)?,
            "primary_key": row.get::<_, i64>(5)? != 0,
        }))
    })?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// SqliteListTablesTool
// ---------------------------------------------------------------------------

/// Table and view listing.
pub struct SqliteListTablesTool;

#[async_trait]
impl Tool for SqliteListTablesTool {
    fn name(&self) -> &str {
        "sqlite_list_tables"
    }

    fn description(&self) -> &str {
        "List all tables and views in the SQLite database"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "database_path": {
                    "type": "string",
                    "description": "Path to the SQLite database file"
                }
            },
            "required": ["database_path"]
        })
    }

    fn returns(&self) -> &str {
        "String - JSON formatted list of tables and views, or error message if retrieval fails"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let database_path = match str_arg(&params, "database_path") {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return "Error: Database path cannot be empty".to_string(),
        };

        run_blocking(move || {
            if !Path::new(&database_path).is_file() {
                return format!("Error: Database file not found: {}", database_path);
            }

            let conn = match open_with_timeout(&database_path, DEFAULT_TIMEOUT_SECS) {
                Ok(c) => c,
                Err(e) => return format!("Error: {}", e),
            };

            let objects = match list_master_objects(&conn) {
                Ok(o) => o,
                Err(e) => return format!("Error: SQLite error listing tables: {}", e),
            };

            let mut tables = Vec::new();
            let mut views = Vec::new();
            for (name, obj_type, _) in objects {
                if obj_type == "table" {
                    tables.push(name);
                } else {
                    views.push(name);
                }
            }

            serde_json::to_string_pretty(&json!({
                "database": database_path,
                "total_tables": tables.len(),
                "total_views": views.len(),
                "tables": tables,
                "views": views,
            }))
            .unwrap_or_else(|e| format!("Error formatting tables: {}", e))
        })
        .await
    }
}
