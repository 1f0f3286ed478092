/*!
 * Result export.
 *
 * Renders a result set as delimited text, JSON or a plain terminal table.
 * Column order is always the order the backend reported.
 */

use anyhow::{Context, Result};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::backend::{ResultSet, Value};

/// Output format for a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// Aligned plain-text table
    #[default]
    Table,
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Array of objects keyed by column
    Json,
}

impl ExportFormat {
    /// Render `result` in this format
    pub fn render(&self, result: &ResultSet) -> Result<String> {
        match self {
            Self::Table => Ok(render_table(result)),
            Self::Csv => Ok(to_delimited(result, ',')),
            Self::Tsv => Ok(to_delimited(result, '\t')),
            Self::Json => to_json(result),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Csv => write!(f, "csv"),
            Self::Tsv => write!(f, "tsv"),
            Self::Json => write!(f, "json"),
        }
    }
}

fn quote_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<I>(out: &mut String, fields: I, delimiter: char)
where
    I: IntoIterator<Item = String>,
{
    let fields: Vec<String> = fields.into_iter().map(|f| quote_field(&f, delimiter)).collect();
    out.push_str(&fields.join(&delimiter.to_string()));
    out.push_str("\r\n");
}

/// Delimited text with a header row, RFC 4180 quoting and CRLF line ends
///
/// NULL becomes an empty field.
pub fn to_delimited(result: &ResultSet, delimiter: char) -> String {
    let mut out = String::new();
    push_record(&mut out, result.columns.iter().cloned(), delimiter);
    for row in &result.rows {
        push_record(&mut out, row.iter().map(Value::to_string), delimiter);
    }
    out
}

/// Object keys for JSON rows; repeated column names get `_2`, `_3`, ...
fn json_keys(columns: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        let mut key = column.clone();
        let mut suffix = 2;
        while keys.contains(&key) {
            key = format!("{}_{}", column, suffix);
            suffix += 1;
        }
        keys.push(key);
    }
    keys
}

struct JsonRow<'a> {
    columns: &'a [String],
    row: &'a [Value],
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.row) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

struct JsonRows<'a>(&'a ResultSet);

impl Serialize for JsonRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keys = json_keys(&self.0.columns);
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&JsonRow { columns: &keys, row })?;
        }
        seq.end()
    }
}

/// Pretty JSON array with one object per row, keys in column order
pub fn to_json(result: &ResultSet) -> Result<String> {
    serde_json::to_string_pretty(&JsonRows(result)).context("Failed to serialize result to JSON")
}

/// Aligned plain-text table for terminal output
pub fn render_table(result: &ResultSet) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string().replace('\n', " ")).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_line = |fields: &[String]| -> String {
        let padded: Vec<String> = fields
            .iter()
            .zip(&widths)
            .map(|(field, width)| format!("{:<width$}", field, width = *width))
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(&result.columns));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &cells {
        out.push_str(&format_line(row));
        out.push('\n');
    }
    out.push_str(&format!("({} row{})\n", result.len(), if result.len() == 1 { "" } else { "s" }));
    out
}

/// Render and write a result to a file
pub fn write_to_file<P: AsRef<Path>>(result: &ResultSet, format: ExportFormat, path: P) -> Result<()> {
    let path = path.as_ref();
    let rendered = format.render(result)?;
    fs::write(path, rendered).with_context(|| format!("Failed to write file: {}", path.display()))
}
