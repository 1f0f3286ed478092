/*!
 * Provider implementations for different text-generation services.
 *
 * This module contains client implementations for various LLM providers:
 * - OpenAI: OpenAI chat completions API (also used for LM Studio)
 * - Anthropic: Anthropic messages API
 * - Ollama: Local LLM server
 * - Mock: scripted provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{GenerationConfig, GenerationProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// Vendor-neutral completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// System instruction
    pub system: String,
    /// User prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum number of output tokens
    pub max_tokens: u32,
}

/// Single text completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Prompt tokens reported by the service
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the service
    pub completion_tokens: Option<u64>,
}

impl Completion {
    /// A completion with text only
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the query translator.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Completion, ProviderError>` - The completion or an error
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError>;
}

/// Build the configured provider client
pub fn from_config(config: &GenerationConfig) -> anyhow::Result<Arc<dyn Provider>> {
    let timeout_secs = config.get_timeout_secs();
    let provider: Arc<dyn Provider> = match config.provider {
        GenerationProvider::OpenAI => Arc::new(openai::OpenAI::new(
            config.get_api_key(),
            config.get_endpoint(),
            timeout_secs,
        )),
        GenerationProvider::LMStudio => {
            // LM Studio often doesn't require an API key; use a default if empty
            let api_key = {
                let k = config.get_api_key();
                if k.is_empty() { "lm-studio".to_string() } else { k }
            };
            Arc::new(openai::OpenAI::new(api_key, config.get_endpoint(), timeout_secs))
        }
        GenerationProvider::Anthropic => Arc::new(anthropic::Anthropic::new(
            config.get_api_key(),
            config.get_endpoint(),
            timeout_secs,
        )),
        GenerationProvider::Ollama => Arc::new(ollama::Ollama::from_endpoint(&config.get_endpoint(), timeout_secs)?),
    };
    Ok(provider)
}

/// Read an error body for reporting, never failing
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string())
}
