/*!
 * Schema registry.
 *
 * Builds the table → column map from a live backend connection. The map is
 * rebuilt on every discovery pass and never cached between questions; it is
 * serialized together with the relationship hints into the text block that
 * the translator embeds in its prompt.
 */

use log::{debug, info};
use serde::Serialize;

use crate::backend::Backend;
use crate::errors::SchemaError;

pub mod hints;
pub mod text;

pub use hints::{ColumnRef, RelationshipHint};
pub use text::{merge, SchemaText};

/// Number of rows sampled per table when none is configured
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

/// Column names of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Table name as reported by the backend
    pub name: String,
    /// Column names in backend order
    pub columns: Vec<String>,
}

impl TableSchema {
    /// Create a table entry
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self { name: name.into(), columns }
    }

    /// Whether the table has `column`, ignoring ASCII case
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Ordered table → columns map with unique table names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    tables: Vec<TableSchema>,
}

impl Schema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing an earlier entry with the same name
    pub fn insert(&mut self, table: TableSchema) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    /// Builder form of [`Schema::insert`]
    pub fn with_table(mut self, name: impl Into<String>, columns: &[&str]) -> Self {
        self.insert(TableSchema::new(name, columns.iter().map(|c| c.to_string()).collect()));
        self
    }

    /// Tables in discovery order
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Look up a table, ignoring ASCII case
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Table names in discovery order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Discover the schema of the connected database
///
/// Lists the tables, then learns each table's column names from a bounded
/// sample of at most `sample_rows` rows. Row contents are never inspected.
pub async fn discover(backend: &mut dyn Backend, sample_rows: usize) -> Result<Schema, SchemaError> {
    let limit = sample_rows.max(1);
    let tables = backend.list_tables().await?;
    debug!("Discovered {} table(s) on {}", tables.len(), backend.engine());

    let mut schema = Schema::new();
    for table in tables {
        let columns = backend.sample_columns(&table, limit).await?;
        schema.insert(TableSchema::new(table, columns));
    }

    info!("Schema discovery found {} table(s)", schema.len());
    Ok(schema)
}
