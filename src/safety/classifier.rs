/*!
 * Read/mutating statement classification.
 *
 * Two rules are provided. `classify_lexical` looks only at the first word of
 * the raw text, so a leading comment or parenthesis hides the real keyword.
 * `classify` runs the text through a SQL tokenizer first, skips trivia and
 * checks the leading keyword of every `;`-separated statement.
 */

use log::debug;
use serde::Serialize;
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::fmt;

/// Leading keywords that change data or schema
pub const MUTATING_KEYWORDS: [&str; 6] = ["insert", "update", "delete", "create", "drop", "alter"];

/// Whether a statement may change backend state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatementClass {
    ReadOnly,
    Mutating,
}

impl StatementClass {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Mutating)
    }
}

impl fmt::Display for StatementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::Mutating => write!(f, "mutating"),
        }
    }
}

fn is_mutating_keyword(word: &str) -> bool {
    MUTATING_KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k))
}

/// Prefix rule on the raw text
///
/// Lower-cases and left-trims, then checks whether the text starts with one
/// of [`MUTATING_KEYWORDS`]. `"-- delete\nselect 1"` is read-only here.
pub fn classify_lexical(sql: &str) -> StatementClass {
    let normalized = sql.trim_start().to_lowercase();
    if MUTATING_KEYWORDS.iter().any(|k| normalized.starts_with(k)) {
        StatementClass::Mutating
    } else {
        StatementClass::ReadOnly
    }
}

/// Tokenizer-based rule
///
/// Comments, whitespace and opening parentheses before a statement are
/// skipped; any statement in the text whose first word is a mutating keyword
/// makes the whole text mutating. Falls back to [`classify_lexical`] when
/// the text cannot be tokenized.
pub fn classify(sql: &str) -> StatementClass {
    let dialect = GenericDialect {};
    let tokens = match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            debug!("Tokenizer rejected statement ({}), using prefix rule", e);
            return classify_lexical(sql);
        }
    };

    let mut at_statement_start = true;
    for token in &tokens {
        match token {
            Token::Whitespace(_) | Token::LParen if at_statement_start => {}
            Token::SemiColon => at_statement_start = true,
            Token::Word(word) if at_statement_start => {
                if is_mutating_keyword(&word.value) {
                    return StatementClass::Mutating;
                }
                at_statement_start = false;
            }
            _ => at_statement_start = false,
        }
    }
    StatementClass::ReadOnly
}
