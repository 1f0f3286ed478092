/*!
 * User-declared relationship hints.
 *
 * A hint is a raw `leftTable.leftCol = rightTable.rightCol` line. Hints are
 * advisory: they are copied into the prompt verbatim and only checked
 * against the discovered schema when validation is switched on.
 */

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;

use super::Schema;
use crate::errors::HintError;

static HINT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][\w$]*)\.([A-Za-z_][\w$]*)\s*=\s*([A-Za-z_][\w$]*)\.([A-Za-z_][\w$]*)\s*$")
        .expect("Invalid relationship hint regex")
});

/// `table.column` reference inside a hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Raw relationship hint line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipHint(String);

impl RelationshipHint {
    /// Wrap a raw hint line
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The hint text exactly as supplied
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a block of text into hints, one per non-blank line
    pub fn from_lines(text: &str) -> Vec<Self> {
        text.lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(Self::new)
            .collect()
    }

    /// Read hints from a file, one per line
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read hints file: {}", path.display()))?;
        Ok(Self::from_lines(&text))
    }

    /// Parse into its two column references
    pub fn parse(&self) -> Result<(ColumnRef, ColumnRef), HintError> {
        let caps = HINT_REGEX.captures(&self.0).ok_or_else(|| HintError::InvalidHint {
            hint: self.0.clone(),
            reason: "expected the form table.column = table.column".to_string(),
        })?;

        let left = ColumnRef { table: caps[1].to_string(), column: caps[2].to_string() };
        let right = ColumnRef { table: caps[3].to_string(), column: caps[4].to_string() };
        Ok((left, right))
    }

    /// Check that both sides name a discovered table and column
    pub fn validate(&self, schema: &Schema) -> Result<(), HintError> {
        let (left, right) = self.parse()?;
        for side in [&left, &right] {
            let reason = match schema.table(&side.table) {
                None => format!("unknown table '{}'", side.table),
                Some(table) if !table.has_column(&side.column) => format!("unknown column '{}'", side),
                Some(_) => continue,
            };
            return Err(HintError::InvalidHint { hint: self.0.clone(), reason });
        }
        Ok(())
    }
}

impl fmt::Display for RelationshipHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelationshipHint {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for RelationshipHint {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Validate every hint, stopping at the first failure
pub fn validate_all(hints: &[RelationshipHint], schema: &Schema) -> Result<(), HintError> {
    hints.iter().try_for_each(|hint| hint.validate(schema))
}
