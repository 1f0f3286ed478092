use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::errors::ConnectionError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Text generation config
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Schema discovery and relationship hints
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Relational engine kind
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    // @engine: embedded file-backed engine
    #[default]
    Sqlite,
    // @engine: networked PostgreSQL server
    Postgres,
    // @engine: networked MySQL server
    Mysql,
}

impl EngineKind {
    // @returns: Human readable engine / dialect name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Postgres => "PostgreSQL",
            Self::Mysql => "MySQL",
        }
    }

    // @returns: Lowercase engine identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Sqlite => "sqlite".to_string(),
            Self::Postgres => "postgres".to_string(),
            Self::Mysql => "mysql".to_string(),
        }
    }

    /// Whether the engine is reached over the network
    pub fn is_networked(&self) -> bool {
        !matches!(self, Self::Sqlite)
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            _ => Err(anyhow!("Invalid engine kind: {}", s)),
        }
    }
}

/// Backend connection configuration
///
/// `host`, `username` and `database` are required for networked engines and
/// ignored for SQLite; `path` is only read for SQLite.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BackendConfig {
    /// Engine to connect to
    #[serde(default)]
    pub engine: EngineKind,

    /// SQLite database file (`:memory:` for an in-memory database)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Server host name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Server port (engine default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Login user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Login password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Database name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl BackendConfig {
    /// SQLite backend at the given path
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            engine: EngineKind::Sqlite,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Resolve the SQLite file, falling back to the user data directory
    pub fn sqlite_path(&self) -> Result<PathBuf, ConnectionError> {
        match self.path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(path) => Ok(PathBuf::from(path)),
            None => crate::backend::SqliteBackend::default_database_path(),
        }
    }

    /// Return a non-empty setting or a `MissingSetting` error
    pub fn required<'a>(
        &self,
        engine: EngineKind,
        setting: &str,
        value: Option<&'a str>,
    ) -> Result<&'a str, ConnectionError> {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConnectionError::MissingSetting {
                engine: engine.display_name().to_string(),
                setting: setting.to_string(),
            })
    }
}

/// Text generation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: Ollama
    Ollama,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl GenerationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Whether the hosted API needs a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: GenerationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Text generation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: GenerationProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common generation settings
    #[serde(default)]
    pub common: GenerationCommonConfig,
}

/// Common generation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationCommonConfig {
    /// System instruction template
    /// Placeholders: {dialect}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation
    /// Kept at 0 so the same question tends to produce the same statement
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum number of output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retry count for transient failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for GenerationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Schema discovery settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchemaConfig {
    /// Rows sampled per table to learn its column names
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,

    /// Reject hints that do not match the discovered schema
    #[serde(default)]
    pub validate_hints: bool,

    /// Relationship hints, one `left.col = right.col` per entry
    #[serde(default)]
    pub hints: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            sample_rows: default_sample_rows(),
            validate_hints: false,
            hints: Vec::new(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sample_rows() -> usize {
    5
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    256
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_endpoint(provider: &GenerationProvider) -> String {
    match provider {
        GenerationProvider::Ollama => "http://localhost:11434".to_string(),
        GenerationProvider::OpenAI => "https://api.openai.com/v1".to_string(),
        GenerationProvider::Anthropic => "https://api.anthropic.com".to_string(),
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        GenerationProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_model(provider: &GenerationProvider) -> String {
    match provider {
        GenerationProvider::Ollama => "llama3.2".to_string(),
        GenerationProvider::OpenAI => "gpt-4o-mini".to_string(),
        GenerationProvider::Anthropic => "claude-3-5-haiku-latest".to_string(),
        // Placeholder; users should set to the loaded model name in LM Studio
        GenerationProvider::LMStudio => "local-model".to_string(),
    }
}

fn default_system_prompt() -> String {
    "You are an expert {dialect} developer. Translate the user's question into exactly one {dialect} SQL statement that runs against the schema provided. Reply with the SQL statement only: no explanation, no comments, no markdown.".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.validate_generation()?;
        self.validate_backend()
    }

    /// Validate the text generation and schema settings
    pub fn validate_generation(&self) -> Result<()> {
        // API key for hosted providers
        if self.generation.provider.requires_api_key() && self.generation.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for {} provider",
                self.generation.provider.display_name()
            ));
        }

        let temperature = self.generation.common.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", temperature));
        }

        if self.generation.common.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be greater than zero"));
        }

        Ok(())
    }

    /// Validate the backend and discovery settings
    pub fn validate_backend(&self) -> Result<()> {
        if self.schema.sample_rows == 0 {
            return Err(anyhow!("sample_rows must be greater than zero"));
        }

        // Networked engines need somewhere to connect to
        if self.backend.engine.is_networked() {
            let engine = self.backend.engine;
            self.backend.required(engine, "host", self.backend.host.as_deref())?;
            self.backend.required(engine, "username", self.backend.username.as_deref())?;
            self.backend.required(engine, "database", self.backend.database.as_deref())?;
        }

        Ok(())
    }
}

impl GenerationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &GenerationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, created on demand
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.model.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model(&self.provider))
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.endpoint.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| default_endpoint(&self.provider))
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(GenerationProvider::OpenAI),
                ProviderConfig::new(GenerationProvider::Anthropic),
                ProviderConfig::new(GenerationProvider::Ollama),
                ProviderConfig::new(GenerationProvider::LMStudio),
            ],
            common: GenerationCommonConfig::default(),
        }
    }
}
