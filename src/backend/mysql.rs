/*!
 * Networked MySQL backend.
 *
 * Tables come from the engine-specific `SHOW TABLES` command; column names
 * come from a bounded `SELECT * ... LIMIT n` sample. Values are fetched
 * through the text protocol, like the PostgreSQL adapter.
 */

use async_trait::async_trait;
use log::{debug, info};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo};

use super::{quote_identifier, value_from_text, Backend, ResultSet, Value};
use crate::app_config::{BackendConfig, EngineKind};
use crate::errors::{ConnectionError, ExecutionError, SchemaError};

/// Default MySQL server port
pub const DEFAULT_PORT: u16 = 3306;

/// SQLSTATE reported for access-denied errors (1045)
const ACCESS_DENIED_STATE: &str = "28000";

/// MySQL adapter holding one session-scoped connection
#[derive(Debug)]
pub struct MysqlBackend {
    conn: Option<MySqlConnection>,
    database: String,
}

fn connection_error(error: sqlx::Error) -> ConnectionError {
    if let sqlx::Error::Database(db) = &error {
        if db.code().as_deref() == Some(ACCESS_DENIED_STATE) {
            return ConnectionError::Authentication(db.message().to_string());
        }
    }
    ConnectionError::Unreachable(error.to_string())
}

fn execution_error(error: sqlx::Error) -> ExecutionError {
    match error {
        sqlx::Error::Database(db) => ExecutionError::Statement(db.message().to_string()),
        sqlx::Error::Io(e) => ExecutionError::Connection(ConnectionError::Unreachable(e.to_string())),
        other => ExecutionError::Statement(other.to_string()),
    }
}

fn row_values(row: &MySqlRow, type_names: &[String]) -> Vec<Value> {
    (0..row.len())
        .map(|index| {
            let text = row.try_get_unchecked::<Option<String>, _>(index).unwrap_or(None);
            let type_name = type_names.get(index).map(String::as_str).unwrap_or("TEXT");
            value_from_text(type_name, text)
        })
        .collect()
}

impl MysqlBackend {
    /// Connect using the networked settings of `config`
    pub async fn connect(config: &BackendConfig) -> Result<Self, ConnectionError> {
        let engine = EngineKind::Mysql;
        let host = config.required(engine, "host", config.host.as_deref())?;
        let username = config.required(engine, "username", config.username.as_deref())?;
        let database = config.required(engine, "database", config.database.as_deref())?;
        let port = config.port.unwrap_or(DEFAULT_PORT);

        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(username)
            .password(config.password.as_deref().unwrap_or_default())
            .database(database)
            // Cached statements would keep describing columns from before DDL
            .statement_cache_capacity(0);

        info!("Connecting to MySQL at {}:{}/{}", host, port, database);
        let conn = MySqlConnection::connect_with(&options).await.map_err(connection_error)?;

        Ok(Self {
            conn: Some(conn),
            database: database.to_string(),
        })
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection, ConnectionError> {
        self.conn.as_mut().ok_or(ConnectionError::Closed)
    }

    async fn run_control(&mut self, sql: &'static str) -> Result<(), ExecutionError> {
        let conn = self.conn()?;
        conn.execute(sqlx::raw_sql(sql)).await.map_err(execution_error)?;
        Ok(())
    }

    async fn run_query(&mut self, sql: &str) -> Result<ResultSet, ExecutionError> {
        let conn = self.conn()?;

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
impl Backend for MysqlBackend {
    fn engine(&self) -> EngineKind {
        EngineKind::Mysql
    }

    async fn list_tables(&mut self) -> Result<Vec<String>, SchemaError> {
        let conn = self.conn()?;
        let rows = conn
            .fetch_all(sqlx::raw_sql("SHOW TABLES"))
            .await
            .map_err(|e| SchemaError::catalog(e.to_string()))?;

        let mut tables: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get_unchecked::<Option<String>, _>(0).ok().flatten())
            .collect();
        tables.sort();
        Ok(tables)
    }

    async fn sample_columns(&mut self, table: &str, limit: usize) -> Result<Vec<String>, SchemaError> {
        let sql = format!("SELECT * FROM {} LIMIT {}", quote_identifier(table, '`'), limit.max(1));
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
        self.run_control("START TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<(), ExecutionError> {
        self.run_control("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), ExecutionError> {
        self.run_control("ROLLBACK").await
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        if let Some(conn) = self.conn.take() {
            debug!("Closing MySQL connection to {}", self.database);
            conn.close().await.map_err(|e| ConnectionError::Unreachable(e.to_string()))?;
        }
        Ok(())
    }
}
