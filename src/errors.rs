/*!
 * Error types for the askdb application.
 *
 * Every backend normalizes its native errors into the same
 * `ConnectionError` / `SchemaError` / `ExecutionError` taxonomy so the
 * schema registry, translator and executor stay engine-agnostic.
 * All types use the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Map a non-success HTTP status and body to the matching variant
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while acquiring or holding a backend connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// A required configuration value is absent
    #[error("Missing '{setting}' setting for {engine} backend")]
    MissingSetting {
        /// Engine the setting belongs to
        engine: String,
        /// Name of the missing setting
        setting: String,
    },

    /// The backend could not be reached or opened
    #[error("Cannot reach backend: {0}")]
    Unreachable(String),

    /// The backend rejected the credentials
    #[error("Backend authentication failed: {0}")]
    Authentication(String),

    /// The connection was already closed
    #[error("Connection is closed")]
    Closed,
}

/// Errors raised during schema introspection
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Introspection query failed
    #[error("Schema introspection failed{}: {message}", table_suffix(.table))]
    Introspection {
        /// Table being inspected, if any
        table: Option<String>,
        /// Native backend message
        message: String,
    },

    /// The underlying connection failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl SchemaError {
    /// Introspection failure not tied to a single table
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Introspection { table: None, message: message.into() }
    }

    /// Introspection failure for a specific table
    pub fn table(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Introspection { table: Some(table.into()), message: message.into() }
    }
}

fn table_suffix(table: &Option<String>) -> String {
    table.as_ref().map(|t| format!(" for table '{}'", t)).unwrap_or_default()
}

/// Errors raised while executing a statement
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// SQL syntax or runtime failure, carrying the backend's native message
    #[error("SQL error: {0}")]
    Statement(String),

    /// The underlying connection failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Errors that can occur during natural-language to SQL translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider did not answer in time
    #[error("Text generation timed out after {0} seconds")]
    Timeout(u64),

    /// The response held no statement once cleaned up
    #[error("Text generation returned an empty response")]
    EmptyResponse,
}

/// Errors raised by relationship hint validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HintError {
    /// The hint is malformed or references unknown tables/columns
    #[error("Invalid relationship hint '{hint}': {reason}")]
    InvalidHint {
        /// The raw hint line
        hint: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors returned while preparing a question in a session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Relationship hints failed validation
    #[error(transparent)]
    Hint(#[from] HintError),

    /// Translation failed
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// Execution failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error connecting to a backend
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Error from schema introspection
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from statement execution
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Error from a session step
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
