/*!
 * Tests for the translator against mock providers
 */

use std::sync::Arc;
use std::time::Duration;

use askdb::app_config::EngineKind;
use askdb::errors::{ProviderError, TranslationError};
use askdb::translator::{is_retryable, TranslatorOptions};
use askdb::{TranslationRequest, Translator};

use crate::common::MockProvider;

fn options() -> TranslatorOptions {
    TranslatorOptions {
        retry_backoff_ms: 0,
        timeout: Duration::from_secs(5),
        ..TranslatorOptions::default()
    }
}

fn translator(provider: &MockProvider, dialect: EngineKind) -> Translator {
    Translator::new(Arc::new(provider.clone()), dialect, options())
}

fn request() -> TranslationRequest {
    TranslationRequest::new("How many orders?", "TABLES:\norders(id)\n\nRELATIONSHIPS:\n")
}

#[tokio::test]
async fn test_translate_shouldRenderDialectIntoSystemPrompt() {
    let provider = MockProvider::answering("SELECT COUNT(*) FROM orders");

    translator(&provider, EngineKind::Postgres).translate(&request()).await.unwrap();

    let sent = provider.last_request().unwrap();
    assert!(sent.system.contains("PostgreSQL"));
    assert!(!sent.system.contains("{dialect}"));
    assert_eq!(sent.temperature, 0.0);
}

#[tokio::test]
async fn test_translate_shouldPlaceSchemaBeforeQuestion() {
    let provider = MockProvider::answering("SELECT 1");

    translator(&provider, EngineKind::Sqlite).translate(&request()).await.unwrap();

    let prompt = provider.last_request().unwrap().prompt;
    let schema_at = prompt.find("orders(id)").unwrap();
    let question_at = prompt.find("How many orders?").unwrap();
    assert!(schema_at < question_at);
    assert!(prompt.trim_end().ends_with("SQL:"));
}

#[tokio::test]
async fn test_translate_withDetails_shouldIncludeThem() {
    let provider = MockProvider::answering("INSERT INTO orders VALUES (5)");
    let request = request().with_details(Some("id=5".to_string()));

    translator(&provider, EngineKind::Mysql).translate(&request).await.unwrap();

    assert!(provider.last_request().unwrap().prompt.contains("id=5"));
}

#[tokio::test]
async fn test_translate_withFencedReply_shouldReturnInnerStatement() {
    let provider = MockProvider::answering("Here you go:\n```sql\nSELECT name FROM customers\n```\nEnjoy");

    let statement = translator(&provider, EngineKind::Sqlite).translate(&request()).await.unwrap();

    assert_eq!(statement.sql(), "SELECT name FROM customers");
    assert_eq!(statement.fingerprint().len(), 64);
}

#[tokio::test]
async fn test_translate_withEmptyReply_shouldFail() {
    let provider = MockProvider::empty();

    let error = translator(&provider, EngineKind::Sqlite).translate(&request()).await.unwrap_err();

    assert!(matches!(error, TranslationError::EmptyResponse));
}

#[tokio::test]
async fn test_translate_withRateLimitThenSuccess_shouldRetry() {
    let provider = MockProvider::scripted(vec![
        Err(ProviderError::RateLimitExceeded("slow down".to_string())),
        Ok("SELECT 1".to_string()),
    ]);

    let statement = translator(&provider, EngineKind::Sqlite).translate(&request()).await.unwrap();

    assert_eq!(statement.sql(), "SELECT 1");
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_translate_withPersistentFailure_shouldStopAfterRetryCount() {
    let provider = MockProvider::intermittent(1, "never");

    let error = translator(&provider, EngineKind::Sqlite).translate(&request()).await.unwrap_err();

    assert!(matches!(error, TranslationError::Provider(ProviderError::ApiError { status_code: 503, .. })));
    assert_eq!(provider.request_count(), 3);
}

#[test]
fn test_isRetryable_shouldRejectAuthenticationFailures() {
    assert!(!is_retryable(&TranslationError::Provider(ProviderError::AuthenticationError("x".into()))));
    assert!(is_retryable(&TranslationError::Provider(ProviderError::ConnectionError("x".into()))));
    assert!(is_retryable(&TranslationError::Timeout(5)));
}
