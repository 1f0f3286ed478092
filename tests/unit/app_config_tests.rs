/*!
 * Tests for application configuration functionality
 */

use askdb::app_config::{BackendConfig, Config, EngineKind, GenerationProvider, LogLevel};
use std::str::FromStr;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.backend.engine, EngineKind::Sqlite);
    assert_eq!(config.generation.provider, GenerationProvider::OpenAI);
    assert_eq!(config.generation.common.temperature, 0.0);
    assert_eq!(config.generation.common.max_tokens, 256);
    assert_eq!(config.generation.common.retry_count, 2);
    assert_eq!(config.schema.sample_rows, 5);
    assert!(!config.schema.validate_hints);
    assert!(config.schema.hints.is_empty());
    assert_eq!(config.log_level, LogLevel::Info);

    let ollama = config.generation.get_provider_config(&GenerationProvider::Ollama)
        .expect("Ollama provider config should exist");
    assert_eq!(ollama.endpoint, "http://localhost:11434");
    assert_eq!(ollama.timeout_secs, 30);
}

#[test]
fn test_systemPrompt_default_shouldMentionDialectPlaceholder() {
    let config = Config::default();
    assert!(config.generation.common.system_prompt.contains("{dialect}"));
}

/// Hosted providers need a key, local ones do not
#[test]
fn test_config_validation_withApiKeys_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_err(), "OpenAI without a key should fail");

    config.generation.active_provider_config_mut().api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());

    config.generation.provider = GenerationProvider::Ollama;
    assert!(config.validate().is_ok());

    config.generation.provider = GenerationProvider::Anthropic;
    assert!(config.validate().is_err());
}

#[test]
fn test_validateBackend_withoutApiKey_shouldStillPass() {
    let config = Config::default();
    assert!(config.validate_backend().is_ok());
    assert!(config.validate_generation().is_err());
}

#[test]
fn test_config_validation_withBadGenerationSettings_shouldFail() {
    let mut config = Config::default();
    config.generation.provider = GenerationProvider::Ollama;

    config.generation.common.temperature = 3.5;
    assert!(config.validate().is_err());
    config.generation.common.temperature = 0.0;

    config.generation.common.max_tokens = 0;
    assert!(config.validate().is_err());
    config.generation.common.max_tokens = 64;

    config.schema.sample_rows = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validateBackend_withNetworkedEngine_shouldRequireSettings() {
    let mut config = Config::default();
    config.backend.engine = EngineKind::Postgres;

    let error = config.validate_backend().unwrap_err().to_string();
    assert!(error.contains("host"), "unexpected error: {}", error);

    config.backend.host = Some("db.local".to_string());
    config.backend.username = Some("reader".to_string());
    assert!(config.validate_backend().unwrap_err().to_string().contains("database"));

    config.backend.database = Some("shop".to_string());
    assert!(config.validate_backend().is_ok());
}

#[test]
fn test_activeProviderConfigMut_withMissingEntry_shouldCreateIt() {
    let mut config = Config::default();
    config.generation.available_providers.clear();
    config.generation.provider = GenerationProvider::LMStudio;

    config.generation.active_provider_config_mut().model = "qwen2.5-coder".to_string();

    assert_eq!(config.generation.available_providers.len(), 1);
    assert_eq!(config.generation.get_model(), "qwen2.5-coder");
    assert_eq!(config.generation.get_endpoint(), "http://localhost:1234/v1");
}

#[test]
fn test_config_deserialization_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "backend": { "engine": "mysql", "host": "db", "username": "u", "database": "shop" },
        "generation": { "provider": "ollama" },
        "schema": { "hints": ["customers.id = orders.customer_id"] },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.backend.engine, EngineKind::Mysql);
    assert_eq!(config.backend.port, None);
    assert_eq!(config.generation.provider, GenerationProvider::Ollama);
    assert_eq!(config.generation.get_model(), "llama3.2");
    assert_eq!(config.schema.sample_rows, 5);
    assert_eq!(config.schema.hints.len(), 1);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_serialization_shouldOmitUnsetBackendFields() {
    let json = serde_json::to_string(&Config::default()).unwrap();
    assert!(json.contains("\"engine\":\"sqlite\""));
    assert!(!json.contains("\"password\""));
}

#[test]
fn test_sqlitePath_withExplicitPath_shouldUseIt() {
    let backend = BackendConfig::sqlite("shop.db");
    assert_eq!(backend.sqlite_path().unwrap(), std::path::PathBuf::from("shop.db"));
}

#[test]
fn test_engineKind_fromStr_shouldAcceptAliases() {
    assert_eq!(EngineKind::from_str("PostgreSQL").unwrap(), EngineKind::Postgres);
    assert_eq!(EngineKind::from_str("mysql").unwrap(), EngineKind::Mysql);
    assert!(EngineKind::from_str("oracle").is_err());
    assert_eq!(EngineKind::Postgres.display_name(), "PostgreSQL");
    assert!(!EngineKind::Sqlite.is_networked());
}

#[test]
fn test_logLevel_toLevelFilter_shouldMapEachLevel() {
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
