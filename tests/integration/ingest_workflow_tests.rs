/*!
 * Integration tests for loading delimited files and querying them
 */

use anyhow::Result;
use std::sync::Arc;

use askdb::app_config::EngineKind;
use askdb::backend::SqliteBackend;
use askdb::export::{self, ExportFormat};
use askdb::session::SessionOptions;
use askdb::translator::TranslatorOptions;
use askdb::{ingest, QuerySession, Translator, Value};

use crate::common::{self, MockProvider};

#[tokio::test]
async fn test_loadThenAsk_shouldQueryLoadedTable() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let csv = common::create_test_file(
        dir.path(),
        "National Parks.csv",
        "name,state,acres\nYellowstone,WY,2219791\n\"Great Smoky Mountains\",\"TN, NC\",522427\n",
    )?;

    let db = SqliteBackend::new_in_memory()?;
    let loaded = ingest::load_path(&db, &csv).await?;
    assert_eq!(loaded[0].table, "national_parks");
    assert_eq!(loaded[0].columns, vec!["name", "state", "acres"]);

    let provider = MockProvider::answering("SELECT name, state FROM national_parks WHERE state LIKE '%NC%'");
    let translator = Translator::new(Arc::new(provider.clone()), EngineKind::Sqlite, TranslatorOptions::default());
    let mut session = QuerySession::new(Box::new(db), translator, vec![], SessionOptions::default());

    let (_, outcome) = session.ask("Which parks are in North Carolina?", None).await?;

    assert!(provider.last_request().unwrap().prompt.contains("national_parks(name, state, acres)"));
    let rows = outcome.rows().expect("read should return rows");
    assert_eq!(rows.rows, vec![vec![Value::from("Great Smoky Mountains"), Value::from("TN, NC")]]);

    let exported = ExportFormat::Csv.render(rows)?;
    assert_eq!(exported, "name,state\r\nGreat Smoky Mountains,\"TN, NC\"\r\n");
    Ok(())
}

#[tokio::test]
async fn test_loadDirectory_thenExportJson_shouldKeepColumnOrder() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "orders.tsv", "id\tcustomer\n1\tAda\n2\t\n")?;
    common::create_test_file(dir.path(), "readme.md", "not data")?;
    let db = SqliteBackend::new_in_memory()?;

    let loaded = ingest::load_path(&db, dir.path()).await?;
    assert_eq!(loaded.len(), 1);

    let provider = MockProvider::answering("SELECT customer, id FROM orders ORDER BY id");
    let translator = Translator::new(Arc::new(provider), EngineKind::Sqlite, TranslatorOptions::default());
    let mut session = QuerySession::new(Box::new(db), translator, vec![], SessionOptions::default());
    let (_, outcome) = session.ask("Orders?", None).await?;
    let rows = outcome.rows().expect("read should return rows");

    let out = dir.path().join("orders.json");
    export::write_to_file(rows, ExportFormat::Json, &out)?;
    let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;

    assert_eq!(parsed[0]["customer"], "Ada");
    assert_eq!(parsed[1]["customer"], serde_json::Value::Null);
    assert_eq!(parsed[1]["id"], "2");
    Ok(())
}
