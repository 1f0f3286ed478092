/*!
 * Natural-language to SQL translation.
 *
 * The translator renders a deterministic prompt from the question and the
 * schema text, sends it to the configured provider and extracts a bare
 * statement from the reply. The provider is treated as an untrusted oracle:
 * nothing here checks that the returned SQL is valid, only that something
 * usable came back in time.
 */

use log::{debug, error, info, warn};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::app_config::{EngineKind, GenerationConfig};
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{CompletionRequest, Provider};

pub mod extract;
pub mod prompts;

pub use extract::extract_statement;
pub use prompts::{user_prompt, PromptTemplate};

/// Input to one translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Plain-language question
    pub question: String,
    /// Serialized schema and relationship hints
    pub schema_text: String,
    /// Literal values to bind into INSERT/UPDATE statements
    pub extra_details: Option<String>,
}

impl TranslationRequest {
    pub fn new(question: impl Into<String>, schema_text: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            schema_text: schema_text.into(),
            extra_details: None,
        }
    }

    /// Attach literal details
    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.extra_details = details;
        self
    }
}

/// SQL text returned by the translator
///
/// Each instance gets its own id, so two generations of the same text are
/// still different statements as far as confirmation is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStatement {
    id: Uuid,
    sql: String,
    fingerprint: String,
}

impl GeneratedStatement {
    /// Wrap statement text as a new instance
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let fingerprint = format!("{:x}", Sha256::digest(sql.as_bytes()));
        Self {
            id: Uuid::new_v4(),
            sql,
            fingerprint,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Hex SHA-256 of the statement text
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Display for GeneratedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Generation settings used by the translator
#[derive(Debug, Clone)]
pub struct TranslatorOptions {
    /// Model identifier
    pub model: String,
    /// System instruction template
    pub system_prompt: PromptTemplate,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Upper bound for one provider call
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub retry_count: u32,
    /// Base backoff, doubled on each retry
    pub retry_backoff_ms: u64,
}

impl TranslatorOptions {
    /// Options from the generation section of the configuration
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            model: config.get_model(),
            system_prompt: PromptTemplate::new(&config.common.system_prompt),
            temperature: config.common.temperature,
            max_tokens: config.common.max_tokens,
            timeout: Duration::from_secs(config.get_timeout_secs()),
            retry_count: config.common.retry_count,
            retry_backoff_ms: config.common.retry_backoff_ms,
        }
    }
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

/// Turns questions into SQL through a text-generation provider
#[derive(Debug, Clone)]
pub struct Translator {
    provider: Arc<dyn Provider>,
    dialect: EngineKind,
    options: TranslatorOptions,
}

impl Translator {
    /// Create a translator targeting `dialect`
    pub fn new(provider: Arc<dyn Provider>, dialect: EngineKind, options: TranslatorOptions) -> Self {
        Self { provider, dialect, options }
    }

    pub fn dialect(&self) -> EngineKind {
        self.dialect
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Build the provider request for a translation
    pub fn completion_request(&self, request: &TranslationRequest) -> CompletionRequest {
        CompletionRequest {
            model: self.options.model.clone(),
            system: self.options.system_prompt.render(self.dialect),
            prompt: user_prompt(&request.schema_text, &request.question, request.extra_details.as_deref()),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        }
    }

    /// Check that the provider answers for the configured model
    pub async fn check_provider(&self) -> Result<(), TranslationError> {
        debug!("Checking provider for model {}", self.options.model);
        tokio::time::timeout(self.options.timeout, self.provider.test_connection(&self.options.model))
            .await
            .map_err(|_| TranslationError::Timeout(self.options.timeout.as_secs()))??;
        Ok(())
    }

    /// Translate a question into a statement
    pub async fn translate(&self, request: &TranslationRequest) -> Result<GeneratedStatement, TranslationError> {
        let completion_request = self.completion_request(request);
        debug!("Translation prompt:\n{}", completion_request.prompt);

        let text = self.complete_with_retry(completion_request).await?;
        let sql = extract_statement(&text).ok_or(TranslationError::EmptyResponse)?;

        info!("Generated statement: {}", sql);
        Ok(GeneratedStatement::new(sql))
    }

    async fn complete_with_retry(&self, request: CompletionRequest) -> Result<String, TranslationError> {
        let mut attempt: u32 = 0;
        loop {
            let call = self.provider.complete(request.clone());
            let result = tokio::time::timeout(self.options.timeout, call)
                .await
                .map_err(|_| TranslationError::Timeout(self.options.timeout.as_secs()))?;

            match result {
                Ok(completion) => {
                    if let (Some(prompt), Some(output)) = (completion.prompt_tokens, completion.completion_tokens) {
                        debug!("Token usage: {} prompt, {} completion", prompt, output);
                    }
                    return Ok(completion.text);
                }
                Err(e) if e.is_transient() && attempt < self.options.retry_count => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        "Transient provider failure ({}), retry {}/{} in {}ms",
                        e, attempt, self.options.retry_count, delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("Provider request failed: {}", e);
                    return Err(TranslationError::Provider(e));
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.options.retry_backoff_ms.saturating_mul(1u64 << (attempt - 1).min(16));
        let jitter = if self.options.retry_backoff_ms > 0 {
            rand::rng().random_range(0..=self.options.retry_backoff_ms / 2)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}

/// Whether an error is worth asking the same question again
pub fn is_retryable(error: &TranslationError) -> bool {
    match error {
        TranslationError::Provider(ProviderError::AuthenticationError(_)) => false,
        TranslationError::Provider(e) => e.is_transient(),
        TranslationError::Timeout(_) | TranslationError::EmptyResponse => true,
    }
}
