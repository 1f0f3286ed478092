/*!
 * Tests for error types and conversions
 */

use askdb::errors::{AppError, ConnectionError, ExecutionError, HintError, ProviderError, SchemaError, SessionError, TranslationError};

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 500,
        message: "Internal error".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("500"));
    assert!(display.contains("Internal error"));
}

#[test]
fn test_providerError_fromStatus_shouldPickVariant() {
    assert!(matches!(ProviderError::from_status(401, "bad key".into()), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(429, "slow down".into()), ProviderError::RateLimitExceeded(_)));
    assert!(matches!(
        ProviderError::from_status(404, "no model".into()),
        ProviderError::ApiError { status_code: 404, .. }
    ));
}

#[test]
fn test_providerError_isTransient_shouldOnlyMatchRetryableFailures() {
    assert!(ProviderError::ConnectionError("reset".into()).is_transient());
    assert!(ProviderError::RateLimitExceeded("429".into()).is_transient());
    assert!(ProviderError::ApiError { status_code: 503, message: String::new() }.is_transient());
    assert!(!ProviderError::ApiError { status_code: 400, message: String::new() }.is_transient());
    assert!(!ProviderError::AuthenticationError("no".into()).is_transient());
    assert!(!ProviderError::ParseError("json".into()).is_transient());
}

#[test]
fn test_connectionError_missingSetting_shouldNameEngineAndSetting() {
    let error = ConnectionError::MissingSetting {
        engine: "PostgreSQL".to_string(),
        setting: "host".to_string(),
    };
    assert_eq!(error.to_string(), "Missing 'host' setting for PostgreSQL backend");
}

#[test]
fn test_schemaError_introspection_shouldMentionTableWhenKnown() {
    let with_table = SchemaError::table("orders", "permission denied");
    assert_eq!(
        with_table.to_string(),
        "Schema introspection failed for table 'orders': permission denied"
    );

    let catalog = SchemaError::catalog("timeout");
    assert_eq!(catalog.to_string(), "Schema introspection failed: timeout");
}

#[test]
fn test_executionError_fromConnectionError_shouldBeTransparent() {
    let error: ExecutionError = ConnectionError::Closed.into();
    assert!(matches!(error, ExecutionError::Connection(ConnectionError::Closed)));
    assert_eq!(error.to_string(), "Connection is closed");
}

#[test]
fn test_translationError_fromProviderError_shouldWrapCorrectly() {
    let error: TranslationError = ProviderError::RequestFailed("boom".to_string()).into();
    assert!(error.to_string().contains("boom"));
    assert_eq!(TranslationError::Timeout(30).to_string(), "Text generation timed out after 30 seconds");
}

#[test]
fn test_sessionError_fromHintError_shouldKeepMessage() {
    let hint = HintError::InvalidHint {
        hint: "a.b = c.d".to_string(),
        reason: "unknown table 'c'".to_string(),
    };
    let error: SessionError = hint.clone().into();
    assert_eq!(error.to_string(), hint.to_string());
}

#[test]
fn test_appError_conversions_shouldPrefixCategory() {
    let from_io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
    assert!(from_io.to_string().starts_with("File error"));

    let from_execution: AppError = ExecutionError::Statement("no such column: x".into()).into();
    assert_eq!(from_execution.to_string(), "Execution error: SQL error: no such column: x");

    let from_anyhow: AppError = anyhow::anyhow!("odd").into();
    assert!(matches!(from_anyhow, AppError::Unknown(_)));
}
