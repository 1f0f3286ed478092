/*!
 * Backend adapters for the supported relational engines.
 *
 * Every engine implements the same [`Backend`] trait:
 * - `sqlite`: embedded file-backed engine (rusqlite)
 * - `postgres`: networked PostgreSQL server (sqlx)
 * - `mysql`: networked MySQL server (sqlx)
 *
 * Callers obtain a boxed adapter through [`connect`] and never branch on
 * the engine themselves.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::app_config::{BackendConfig, EngineKind};
use crate::errors::{ConnectionError, ExecutionError, SchemaError};

pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod value;

pub use mysql::MysqlBackend;
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;
pub use value::{ResultSet, Value};

/// Uniform operations over one open connection to a relational engine
///
/// `execute` never commits on its own: data-modifying statements must be
/// bracketed by `begin` and `commit` (or `rollback`) by the caller.
#[async_trait]
pub trait Backend: Send + Debug {
    /// Which engine this adapter talks to
    fn engine(&self) -> EngineKind;

    /// List the user tables visible on this connection
    async fn list_tables(&mut self) -> Result<Vec<String>, SchemaError>;

    /// Learn the column names of a table from a bounded sample
    ///
    /// # Arguments
    /// * `table` - Table name as returned by `list_tables`
    /// * `limit` - Maximum number of rows to sample
    async fn sample_columns(&mut self, table: &str, limit: usize) -> Result<Vec<String>, SchemaError>;

    /// Run one statement and collect all of its rows
    async fn execute(&mut self, sql: &str) -> Result<ResultSet, ExecutionError>;

    /// Open a transaction
    async fn begin(&mut self) -> Result<(), ExecutionError>;

    /// Commit the open transaction
    async fn commit(&mut self) -> Result<(), ExecutionError>;

    /// Roll back the open transaction
    async fn rollback(&mut self) -> Result<(), ExecutionError>;

    /// Release the connection; later calls fail with `ConnectionError::Closed`
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Open a connection for the configured engine
pub async fn connect(config: &BackendConfig) -> Result<Box<dyn Backend>, ConnectionError> {
    match config.engine {
        EngineKind::Sqlite => {
            let path = config.sqlite_path()?;
            Ok(Box::new(SqliteBackend::open(path)?))
        }
        EngineKind::Postgres => Ok(Box::new(PostgresBackend::connect(config).await?)),
        EngineKind::Mysql => Ok(Box::new(MysqlBackend::connect(config).await?)),
    }
}

/// Quote an identifier with the given quote character, doubling embedded quotes
pub fn quote_identifier(name: &str, quote: char) -> String {
    let escaped = name.replace(quote, &format!("{}{}", quote, quote));
    format!("{}{}{}", quote, escaped, quote)
}

/// Build a typed cell from the text form a networked engine sends back
///
/// `type_name` is the engine's column type name; unknown types stay text.
pub(crate) fn value_from_text(type_name: &str, text: Option<String>) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };

    let upper = type_name.to_ascii_uppercase();
    let base = upper.trim_end_matches(" UNSIGNED");
    match base {
        "INT2" | "INT4" | "INT8" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER"
        | "BIGINT" | "YEAR" => text.parse::<i64>().map(Value::Integer).unwrap_or(Value::Text(text)),
        "FLOAT4" | "FLOAT8" | "FLOAT" | "DOUBLE" | "REAL" => {
            text.parse::<f64>().map(Value::Real).unwrap_or(Value::Text(text))
        }
        "BOOL" | "BOOLEAN" => match text.as_str() {
            "t" | "true" | "1" => Value::Bool(true),
            "f" | "false" | "0" => Value::Bool(false),
            _ => Value::Text(text),
        },
        _ => Value::Text(text),
    }
}
