/*!
 * Integration tests for asking questions end to end
 *
 * A real in-memory SQLite database stands behind the session; only the
 * text-generation provider is mocked.
 */

use anyhow::Result;
use std::sync::Arc;

use askdb::app_config::{BackendConfig, Config, EngineKind};
use askdb::session::SessionOptions;
use askdb::translator::TranslatorOptions;
use askdb::{QuerySession, RelationshipHint, RunOutcome, SessionError, StatementClass, Translator, Value};

use crate::common::{self, recording_backend::{Call, RecordingBackend}, MockProvider};

async fn shop_session(provider: &MockProvider, hints: Vec<RelationshipHint>) -> Result<QuerySession> {
    common::init_test_logging();
    let db = common::shop_database().await?;
    let translator = Translator::new(Arc::new(provider.clone()), EngineKind::Sqlite, TranslatorOptions::default());
    Ok(QuerySession::new(Box::new(db), translator, hints, SessionOptions::default()))
}

#[tokio::test]
async fn test_ask_withJoinQuestion_shouldReturnMatchingRows() -> Result<()> {
    let provider = MockProvider::answering(
        "```sql\nSELECT DISTINCT c.name FROM customers c JOIN orders o ON c.id = o.customer_id \
         WHERE o.date LIKE '2025%' ORDER BY c.name\n```",
    );
    let hints = vec![RelationshipHint::new("customers.id = orders.customer_id")];
    let mut session = shop_session(&provider, hints).await?;

    let (prepared, outcome) = session.ask("List customer names who ordered in 2025", None).await?;

    assert_eq!(prepared.class, StatementClass::ReadOnly);
    assert!(!prepared.sql().contains("```"));
    let rows = outcome.rows().expect("read should return rows");
    assert_eq!(rows.columns, vec!["name"]);
    assert_eq!(rows.rows, vec![vec![Value::from("Grace")], vec![Value::from("Linus")]]);

    let prompt = provider.last_request().unwrap().prompt;
    assert!(prompt.contains("customers(id, name, city)"));
    assert!(prompt.contains("orders(id, customer_id, date)"));
    assert!(prompt.contains("RELATIONSHIPS:\ncustomers.id = orders.customer_id\n"));

    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_ask_withEmptyResult_shouldKeepColumns() -> Result<()> {
    let provider = MockProvider::answering("SELECT name, city FROM customers WHERE city = 'Paris'");
    let mut session = shop_session(&provider, vec![]).await?;

    let (_, outcome) = session.ask("Who lives in Paris?", None).await?;

    let rows = outcome.rows().expect("read should return rows");
    assert!(rows.is_empty());
    assert_eq!(rows.columns, vec!["name", "city"]);
    Ok(())
}

#[tokio::test]
async fn test_delete_shouldWaitForConfirmationThenApply() -> Result<()> {
    let provider = MockProvider::answering("DELETE FROM orders WHERE date LIKE '2020%'");
    let mut session = shop_session(&provider, vec![]).await?;

    let prepared = session.prepare("Delete all orders from 2020", None).await?;
    assert!(prepared.is_mutating());

    let outcome = session.execute(&prepared).await?;
    assert_eq!(outcome, RunOutcome::AwaitingConfirmation);
    assert_eq!(common::count_rows(session.backend_mut(), "orders").await?, 4);

    session.confirm(&prepared);
    let outcome = session.execute(&prepared).await?;
    assert_eq!(outcome, RunOutcome::Applied { rows_affected: 2 });
    assert_eq!(common::count_rows(session.backend_mut(), "orders").await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_insert_withDetails_shouldPassValuesAndCommit() -> Result<()> {
    let provider = MockProvider::answering("INSERT INTO customers (id, name, city) VALUES (4, 'Edsger', 'Austin')");
    let mut session = shop_session(&provider, vec![]).await?;

    let prepared = session.prepare("Add a customer", Some("name=Edsger, city=Austin")).await?;
    session.confirm(&prepared);
    session.execute(&prepared).await?;

    assert!(provider.last_request().unwrap().prompt.contains("name=Edsger, city=Austin"));
    assert_eq!(common::count_rows(session.backend_mut(), "customers").await?, 4);
    Ok(())
}

#[tokio::test]
async fn test_ask_withBadSql_shouldSurfaceNativeMessage() -> Result<()> {
    let provider = MockProvider::answering("SELECT nickname FROM customers");
    let mut session = shop_session(&provider, vec![]).await?;

    let error = session.ask("Nicknames?", None).await.unwrap_err();

    assert!(matches!(error, SessionError::Execution(_)));
    assert!(error.to_string().contains("no such column"), "unexpected error: {}", error);
    Ok(())
}

#[tokio::test]
async fn test_prepare_afterSchemaChange_shouldSeeNewTable() -> Result<()> {
    let provider = MockProvider::answering("SELECT 1");
    let mut session = shop_session(&provider, vec![]).await?;

    session.prepare("first", None).await?;
    session.backend_mut().execute("CREATE TABLE products (sku TEXT, price REAL)").await?;
    session.prepare("second", None).await?;

    let requests = provider.requests();
    assert!(!requests[0].prompt.contains("products("));
    assert!(requests[1].prompt.contains("products(sku, price)"));
    Ok(())
}

#[tokio::test]
async fn test_prepare_withFailingDiscovery_shouldTranslateWithEmptySchema() -> Result<()> {
    let provider = MockProvider::answering("SELECT 1");
    let backend = RecordingBackend::new().failing_discovery();
    let log = backend.log();
    let translator = Translator::new(Arc::new(provider.clone()), EngineKind::Sqlite, TranslatorOptions::default());
    let options = SessionOptions { validate_hints: true, ..SessionOptions::default() };
    let mut session = QuerySession::new(
        Box::new(backend),
        translator,
        vec![RelationshipHint::new("a.id = b.a_id")],
        options,
    );

    let prepared = session.prepare("anything", None).await?;

    assert!(prepared.schema_error.is_some());
    assert_eq!(prepared.schema_text.as_str(), "TABLES:\n\nRELATIONSHIPS:\na.id = b.a_id\n");
    assert_eq!(provider.request_count(), 1);

    session.close().await?;
    assert_eq!(log.lock().last(), Some(&Call::Close));
    Ok(())
}

/// Sessions also work from synchronous callers
#[test]
fn test_session_withBlockingCaller_shouldAnswer() -> Result<()> {
    let provider = MockProvider::answering("SELECT COUNT(*) AS n FROM customers WHERE city = 'Denver'");

    let outcome = tokio_test::block_on(async {
        let mut session = shop_session(&provider, vec![]).await?;
        let (_, outcome) = session.ask("How many customers live in Denver?", None).await?;
        session.close().await?;
        Ok::<_, anyhow::Error>(outcome)
    })?;

    assert_eq!(outcome.rows().unwrap().rows, vec![vec![Value::Integer(2)]]);
    Ok(())
}

#[tokio::test]
async fn test_connect_withSqliteFile_shouldPersistAcrossSessions() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("shop.db");
    let mut config = Config::default();
    config.backend = BackendConfig::sqlite(path.to_string_lossy().to_string());

    let writer = MockProvider::answering("CREATE TABLE notes (body TEXT)");
    let mut session = QuerySession::connect(&config, Arc::new(writer)).await?;
    let prepared = session.prepare("Make a notes table", None).await?;
    session.confirm(&prepared);
    session.execute(&prepared).await?;
    session.close().await?;

    let reader = MockProvider::answering("SELECT body FROM notes");
    let mut session = QuerySession::connect(&config, Arc::new(reader.clone())).await?;
    let (_, outcome) = session.ask("Show the notes", None).await?;
    session.close().await?;

    assert!(outcome.rows().unwrap().is_empty());
    assert!(reader.last_request().unwrap().prompt.contains("notes(body)"));
    Ok(())
}
