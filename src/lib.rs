/*!
 * # askdb - ask a relational database questions in plain language
 *
 * A Rust library that turns natural-language questions into SQL with a
 * text-generation provider, runs them against SQLite, PostgreSQL or MySQL,
 * and returns the rows.
 *
 * ## Features
 *
 * - Schema discovery on every question, merged with user relationship hints
 * - Translation through various AI providers:
 *   - OpenAI API (and OpenAI-compatible servers such as LM Studio)
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Read/mutating classification with an explicit confirmation gate
 * - CSV/TSV ingestion into the embedded database
 * - CSV, TSV, JSON and plain-table export
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `backend`: One adapter per database engine behind the `Backend` trait
 * - `schema`: Schema discovery, relationship hints and schema text
 * - `translator`: Prompt construction and statement extraction
 * - `providers`: Client implementations for various LLM providers
 * - `safety`: Statement classification and the confirmation gate
 * - `executor`: Transactional execution and result packaging
 * - `session`: The explicit per-user session driving the flow
 * - `ingest` / `export`: Delimited-text import and result export
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod backend;
pub mod errors;
pub mod executor;
pub mod export;
pub mod ingest;
pub mod providers;
pub mod safety;
pub mod schema;
pub mod session;
pub mod translator;

// Re-export main types for easier usage
pub use app_config::Config;
pub use backend::{Backend, ResultSet, Value};
pub use errors::{AppError, ConnectionError, ExecutionError, HintError, ProviderError, SchemaError, SessionError, TranslationError};
pub use executor::RunOutcome;
pub use safety::{classify, classify_lexical, StatementClass};
pub use schema::{merge, RelationshipHint, Schema, SchemaText};
pub use session::{PreparedQuery, QuerySession};
pub use translator::{GeneratedStatement, TranslationRequest, Translator};
