/*!
 * Networked PostgreSQL backend.
 *
 * Tables come from `information_schema.tables` for the current schema;
 * column names come from a bounded `SELECT * ... LIMIT n` sample.
 * Statements are prepared first (which also yields the column list for
 * empty results) and their rows are fetched through the simple query
 * protocol so every value arrives in text form.
 */

use async_trait::async_trait;
use log::{debug, info};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo};

use super::{quote_identifier, value_from_text, Backend, ResultSet, Value};
use crate::app_config::{BackendConfig, EngineKind};
use crate::errors::{ConnectionError, ExecutionError, SchemaError};

/// Default PostgreSQL server port
pub const DEFAULT_PORT: u16 = 5432;

/// PostgreSQL adapter holding one session-scoped connection
#[derive(Debug)]
pub struct PostgresBackend {
    /// Open connection, `None` once closed
    conn: Option<PgConnection>,
    /// Database name, for logging
    database: String,
}

/// Normalize a connect-time failure
fn connection_error(error: sqlx::Error) -> ConnectionError {
    if let sqlx::Error::Database(db) = &error {
        // invalid_password / invalid_authorization_specification
        if matches!(db.code().as_deref(), Some("28P01") | Some("28000")) {
            return ConnectionError::Authentication(db.message().to_string());
        }
    }
    ConnectionError::Unreachable(error.to_string())
}

/// Normalize a statement failure, keeping the server's own message
fn execution_error(error: sqlx::Error) -> ExecutionError {
    match error {
        sqlx::Error::Database(db) => ExecutionError::Statement(db.message().to_string()),
        sqlx::Error::Io(e) => ExecutionError::Connection(ConnectionError::Unreachable(e.to_string())),
        other => ExecutionError::Statement(other.to_string()),
    }
}

fn row_values(row: &PgRow, type_names: &[String]) -> Vec<Value> {
    (0..row.len())
        .map(|index| {
            let text = row.try_get_unchecked::<Option<String>, _>(index).unwrap_or(None);
            let type_name = type_names.get(index).map(String::as_str).unwrap_or("TEXT");
            value_from_text(type_name, text)
        })
        .collect()
}

impl PostgresBackend {
    /// Connect using the networked settings of `config`
    pub async fn connect(config: &BackendConfig) -> Result<Self, ConnectionError> {
        let engine = EngineKind::Postgres;
        let host = config.required(engine, "host", config.host.as_deref())?;
        let username = config.required(engine, "username", config.username.as_deref())?;
        let database = config.required(engine, "database", config.database.as_deref())?;
        let port = config.port.unwrap_or(DEFAULT_PORT);

        let options = PgConnectOptions::new()
            .host(host)
            .port(port)
            .username(username)
            .password(config.password.as_deref().unwrap_or_default())
            .database(database)
            // Cached statements would keep describing columns from before DDL
            .statement_cache_capacity(0);

        info!("Connecting to PostgreSQL at {}:{}/{}", host, port, database);
        let conn = PgConnection::connect_with(&options).await.map_err(connection_error)?;

        Ok(Self {
            conn: Some(conn),
            database: database.to_string(),
        })
    }

    fn conn(&mut self) -> Result<&mut PgConnection, ConnectionError> {
        self.conn.as_mut().ok_or(ConnectionError::Closed)
    }

    async fn run_control(&mut self, sql: &'static str) -> Result<(), ExecutionError> {
        let conn = self.conn()?;
        conn.execute(sqlx::raw_sql(sql)).await.map_err(execution_error)?;
        Ok(())
    }

    async fn run_query(&mut self, sql: &str) -> Result<ResultSet, ExecutionError> {
        let conn = self.conn()?;

        // Preparing rejects multi-statement text and describes the columns
        let statement = (&mut *conn).prepare(sql).await.map_err(execution_error)?;
        let columns: Vec<String> = statement.columns().iter().map(|c| c.name().to_string()).collect();
        let type_names: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.type_info().name().to_string())
            .collect();

        if columns.is_empty() {
            let done = conn.execute(sqlx::query(sql)).await.map_err(execution_error)?;
            return Ok(ResultSet::affected(done.rows_affected()));
        }

        let rows = conn.fetch_all(sqlx::raw_sql(sql)).await.map_err(execution_error)?;
        let rows: Vec<Vec<Value>> = rows.iter().map(|row| row_values(row, &type_names)).collect();

        let mut result = ResultSet::new(columns, rows);
        result.rows_affected = result.rows.len() as u64;
        Ok(result)
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    async fn list_tables(&mut self) -> Result<Vec<String>, SchemaError> {
        let conn = self.conn()?;
        sqlx::query_scalar::<_, String>(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )
        .fetch_all(conn)
        .await
        .map_err(|e| SchemaError::catalog(e.to_string()))
    }

    async fn sample_columns(&mut self, table: &str, limit: usize) -> Result<Vec<String>, SchemaError> {
        let sql = format!("SELECT * FROM {} LIMIT {}", quote_identifier(table, '"'), limit.max(1));
        match self.run_query(&sql).await {
            Ok(result) => Ok(result.columns),
            Err(ExecutionError::Connection(e)) => Err(SchemaError::Connection(e)),
            Err(e) => Err(SchemaError::table(table, e.to_string())),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<ResultSet, ExecutionError> {
        self.run_query(sql).await
    }

    async fn begin(&mut self) -> Result<(), ExecutionError> {
        self.run_control("BEGIN").await
    }

    async fn commit(&mut self) -> Result<(), ExecutionError> {
        self.run_control("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), ExecutionError> {
        self.run_control("ROLLBACK").await
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        if let Some(conn) = self.conn.take() {
            debug!("Closing PostgreSQL connection to {}", self.database);
            conn.close().await.map_err(|e| ConnectionError::Unreachable(e.to_string()))?;
        }
        Ok(())
    }
}
