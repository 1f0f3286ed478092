/*!
 * Schema text serialization.
 *
 * ```text
 * TABLES:
 * customers(id, name, city)
 * orders(id, customer_id, date)
 *
 * RELATIONSHIPS:
 * customers.id = orders.customer_id
 * ```
 */

use std::fmt;

use super::{RelationshipHint, Schema};

/// Serialized schema and hints embedded in the translation prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaText(String);

impl SchemaText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SchemaText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Serialize a schema and its hints
///
/// Output depends only on the arguments. Hints are copied verbatim, even
/// when they name columns that do not exist.
pub fn merge(schema: &Schema, hints: &[RelationshipHint]) -> SchemaText {
    let mut text = String::from("TABLES:\n");
    for table in schema.tables() {
        text.push_str(&table.name);
        text.push('(');
        text.push_str(&table.columns.join(", "));
        text.push_str(")\n");
    }

    text.push_str("\nRELATIONSHIPS:\n");
    for hint in hints {
        text.push_str(hint.as_str());
        text.push('\n');
    }

    SchemaText(text)
}
