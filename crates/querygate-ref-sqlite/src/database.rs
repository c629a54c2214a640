//! SQLite implementation of `DatabasePort`.
//!
//! The connection sits behind a `Mutex` and every call runs on
//! `tokio::task::spawn_blocking`, so concurrent runs share one connection
//! without blocking the async runtime.
//!
//! Query results keep the statement's column order:
//! `{"columns": [..], "rows": [[..], ..]}`. Statements without result
//! columns report `{"rows_affected": n}`.
//!
//! A statement the database rejects comes back as a failed
//! `ExecutionResult` carrying SQLite's message; only a poisoned lock or a
//! panicked worker is a port error.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{json, Value};
use tracing::debug;

use querygate_contracts::{
    error::{QueryGateError, QueryGateResult},
    step::ExecutionResult,
};
use querygate_core::traits::DatabasePort;

use crate::mock_data;

#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> QueryGateResult<Self> {
        let conn = Connection::open(path).map_err(|e| QueryGateError::Database {
            reason: format!("failed to open '{}': {}", path.display(), e),
        })?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> QueryGateResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Ok(Self::from_connection(conn))
    }

    /// An in-memory database seeded with the sample shop data.
    pub fn sample() -> QueryGateResult<Self> {
        let db = Self::open_in_memory()?;
        db.with_connection(|conn| mock_data::seed(conn).map_err(db_error))?;
        Ok(db)
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Arc::new(Mutex::new(conn)) }
    }

    /// Run `f` against the connection on the current thread.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> QueryGateResult<T>,
    ) -> QueryGateResult<T> {
        let conn = self.conn.lock().map_err(|e| QueryGateError::Database {
            reason: format!("connection lock poisoned: {}", e),
        })?;
        f(&conn)
    }

    async fn blocking<T, F>(&self, f: F) -> QueryGateResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> QueryGateResult<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_connection(f))
            .await
            .map_err(|e| QueryGateError::Database { reason: format!("database worker failed: {}", e) })?
    }
}

#[async_trait]
impl DatabasePort for SqliteDatabase {
    async fn execute(&self, sql: &str, params: &[Value]) -> QueryGateResult<ExecutionResult> {
        debug!(sql, params = params.len(), "executing statement");
        let sql = sql.to_string();
        let params: Vec<SqlValue> = params.iter().map(to_sql).collect();
        self.blocking(move |conn| Ok(run_statement(conn, &sql, &params))).await
    }

    async fn get_schema(&self) -> QueryGateResult<BTreeMap<String, Vec<String>>> {
        self.blocking(|conn| read_schema(conn).map_err(db_error)).await
    }
}

fn run_statement(conn: &Connection, sql: &str, params: &[SqlValue]) -> ExecutionResult {
    let mut stmt = match conn.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) => return ExecutionResult::failure(e.to_string()),
    };

    if stmt.column_count() == 0 {
        return match stmt.execute(params_from_iter(params.iter())) {
            Ok(changed) => ExecutionResult::rows(json!({ "rows_affected": changed }), changed as u64),
            Err(e) => ExecutionResult::failure(e.to_string()),
        };
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = match stmt.query(params_from_iter(params.iter())) {
        Ok(rows) => rows,
        Err(e) => return ExecutionResult::failure(e.to_string()),
    };

    let mut out = Vec::new();
    loop {
        match rows.next() {
            Ok(Some(row)) => {
                let mut record = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    match row.get_ref(i) {
                        Ok(value) => record.push(from_sql(value)),
                        Err(e) => return ExecutionResult::failure(e.to_string()),
                    }
                }
                out.push(Value::Array(record));
            }
            Ok(None) => break,
            Err(e) => return ExecutionResult::failure(e.to_string()),
        }
    }

    let count = out.len() as u64;
    ExecutionResult::rows(json!({ "columns": columns, "rows": out }), count)
}

fn read_schema(conn: &Connection) -> rusqlite::Result<BTreeMap<String, Vec<String>>> {
    let mut tables = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = tables
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut columns = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let mut schema = BTreeMap::new();
    for name in names {
        let cols = columns
            .query_map([&name], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        schema.insert(name, cols);
    }
    Ok(schema)
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob: {} bytes>", bytes.len())),
    }
}

pub(crate) fn db_error(e: rusqlite::Error) -> QueryGateError {
    QueryGateError::Database { reason: e.to_string() }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use querygate_contracts::display::TabularData;
    use querygate_core::traits::DatabasePort;

    use super::SqliteDatabase;

    #[tokio::test]
    async fn schema_lists_seeded_tables_with_columns() {
        let db = SqliteDatabase::sample().unwrap();
        let schema = db.get_schema().await.unwrap();

        let tables: Vec<&str> = schema.keys().map(String::as_str).collect();
        assert_eq!(tables, vec!["customers", "orders", "products"]);
        assert_eq!(schema["customers"], vec!["id", "name", "region", "signup_date"]);
    }

    #[tokio::test]
    async fn select_returns_columns_and_rows() {
        let db = SqliteDatabase::sample().unwrap();
        let result = db
            .execute("SELECT name FROM customers WHERE region = ?1 ORDER BY id", &[json!("EMEA")])
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.row_count, Some(2));
        let data = result.data.unwrap();
        assert_eq!(data["columns"], json!(["name"]));
        assert_eq!(data["rows"][0], json!(["Ada Lovelace"]));
    }

    #[tokio::test]
    async fn select_keeps_the_statement_column_order() {
        let db = SqliteDatabase::sample().unwrap();
        let result = db
            .execute("SELECT name, id, region FROM customers WHERE id = 1", &[])
            .await
            .unwrap();

        let table = TabularData::normalize(&result.data.unwrap()).unwrap();
        assert_eq!(table.columns, vec!["name", "id", "region"]);
        assert_eq!(table.rows, vec![vec![json!("Ada Lovelace"), json!(1), json!("EMEA")]]);
    }

    #[tokio::test]
    async fn empty_result_keeps_its_header() {
        let db = SqliteDatabase::sample().unwrap();
        let result = db
            .execute("SELECT name, id FROM customers WHERE id < 0", &[])
            .await
            .unwrap();

        assert_eq!(result.row_count, Some(0));
        let table = TabularData::normalize(&result.data.unwrap()).unwrap();
        assert_eq!(table.columns, vec!["name", "id"]);
        assert_eq!(table.row_count(), 0);
    }

    #[tokio::test]
    async fn write_reports_rows_affected() {
        let db = SqliteDatabase::sample().unwrap();
        let result = db
            .execute("UPDATE products SET price = price * 2 WHERE category = ?1", &[json!("hardware")])
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.row_count, Some(2));
    }

    #[tokio::test]
    async fn bad_sql_is_a_failed_result_not_an_error() {
        let db = SqliteDatabase::sample().unwrap();
        let result = db.execute("SELECT totl FROM orders", &[]).await.unwrap();

        assert!(result.is_failure());
        assert!(result.error.unwrap().contains("totl"));
    }

    #[tokio::test]
    async fn multiple_statements_are_rejected() {
        let db = SqliteDatabase::sample().unwrap();
        let result = db.execute("SELECT 1; DROP TABLE orders", &[]).await.unwrap();
        assert!(result.is_failure());

        let schema = db.get_schema().await.unwrap();
        assert!(schema.contains_key("orders"));
    }
}
