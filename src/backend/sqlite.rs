/*!
 * Embedded SQLite backend.
 *
 * Wraps a rusqlite connection behind `Arc<Mutex<..>>` and runs every call
 * on tokio's blocking pool via `spawn_blocking`. Schema discovery reads the
 * catalog directly (`sqlite_master`, `pragma_table_info`).
 */

use async_trait::async_trait;
use log::{debug, info};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{Backend, ResultSet, Value};
use crate::app_config::EngineKind;
use crate::errors::{ConnectionError, ExecutionError, SchemaError};

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "askdb.db";

/// Default database directory name under user's data directory
const DEFAULT_DB_DIRNAME: &str = "askdb";

/// Embedded SQLite adapter with thread-safe access
#[derive(Clone)]
pub struct SqliteBackend {
    /// Path to the database file
    db_path: PathBuf,
    /// Connection, `None` once closed
    connection: Arc<Mutex<Option<Connection>>>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").field("db_path", &self.db_path).finish()
    }
}

impl SqliteBackend {
    /// Open (or create) a database file; `:memory:` opens an in-memory database
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, ConnectionError> {
        let db_path = db_path.as_ref().to_path_buf();
        if db_path.as_os_str() == ":memory:" {
            return Self::new_in_memory();
        }

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConnectionError::Unreachable(format!("Failed to create database directory {:?}: {}", parent, e))
            })?;
        }

        info!("Opening database at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .map_err(|e| ConnectionError::Unreachable(format!("Failed to open database {:?}: {}", db_path, e)))?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Create an in-memory database
    pub fn new_in_memory() -> Result<Self, ConnectionError> {
        debug!("Creating in-memory database");

        let conn = Connection::open_in_memory()
            .map_err(|e| ConnectionError::Unreachable(format!("Failed to create in-memory database: {}", e)))?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Get the default database path
    pub fn default_database_path() -> Result<PathBuf, ConnectionError> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| ConnectionError::Unreachable("Could not determine data directory".to_string()))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run a closure against the connection on the blocking pool
    ///
    /// The outer result reports connection problems (closed, lock, task
    /// failure); the inner one is whatever the closure returned.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<rusqlite::Result<T>, ConnectionError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| ConnectionError::Unreachable(format!("Failed to acquire database lock: {}", e)))?;
            let conn = guard.as_mut().ok_or(ConnectionError::Closed)?;
            Ok(f(conn))
        })
        .await
        .map_err(|e| ConnectionError::Unreachable(format!("Database task panicked: {}", e)))?
    }

    async fn run_control(&self, sql: &'static str) -> Result<(), ExecutionError> {
        self.run_blocking(move |conn| conn.execute_batch(sql))
            .await?
            .map_err(|e| ExecutionError::Statement(e.to_string()))
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Prepare and run one statement, collecting every row
fn run_statement(conn: &Connection, sql: &str) -> rusqlite::Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    if columns.is_empty() {
        let changed = stmt.execute([])?;
        return Ok(ResultSet::affected(changed as u64));
    }

    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for index in 0..width {
            values.push(value_from_ref(row.get_ref(index)?));
        }
        rows.push(values);
    }

    let rows_affected = rows.len() as u64;
    let mut result = ResultSet::new(columns, rows);
    result.rows_affected = rows_affected;
    Ok(result)
}

#[async_trait]
impl Backend for SqliteBackend {
    fn engine(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    async fn list_tables(&mut self) -> Result<Vec<String>, SchemaError> {
        self.run_blocking(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
            names.collect::<rusqlite::Result<Vec<String>>>()
        })
        .await?
        .map_err(|e| SchemaError::catalog(e.to_string()))
    }

    async fn sample_columns(&mut self, table: &str, _limit: usize) -> Result<Vec<String>, SchemaError> {
        let name = table.to_string();
        let columns = self
            .run_blocking(move |conn| {
                let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
                let names = stmt.query_map([name], |row| row.get::<_, String>(0))?;
                names.collect::<rusqlite::Result<Vec<String>>>()
            })
            .await?
            .map_err(|e| SchemaError::table(table, e.to_string()))?;

        if columns.is_empty() {
            return Err(SchemaError::table(table, "no such table"));
        }
        Ok(columns)
    }

    async fn execute(&mut self, sql: &str) -> Result<ResultSet, ExecutionError> {
        let sql = sql.to_string();
        self.run_blocking(move |conn| run_statement(conn, &sql))
            .await?
            .map_err(|e| ExecutionError::Statement(e.to_string()))
    }

    async fn begin(&mut self) -> Result<(), ExecutionError> {
        self.run_control("BEGIN").await
    }

    async fn commit(&mut self) -> Result<(), ExecutionError> {
        self.run_control("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), ExecutionError> {
        // A failed statement may already have ended the transaction
        self.run_blocking(|conn| {
            if conn.is_autocommit() {
                Ok(())
            } else {
                conn.execute_batch("ROLLBACK")
            }
        })
        .await?
        .map_err(|e| ExecutionError::Statement(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        let conn = self.connection.clone();
        let taken = tokio::task::spawn_blocking(move || {
            conn.lock()
                .map(|mut guard| guard.take())
                .map_err(|e| ConnectionError::Unreachable(format!("Failed to acquire database lock: {}", e)))
        })
        .await
        .map_err(|e| ConnectionError::Unreachable(format!("Database task panicked: {}", e)))??;

        match taken {
            Some(conn) => {
                debug!("Closing database at: {:?}", self.db_path);
                conn.close()
                    .map_err(|(_, e)| ConnectionError::Unreachable(format!("Failed to close database: {}", e)))
            }
            None => Ok(()),
        }
    }
}
