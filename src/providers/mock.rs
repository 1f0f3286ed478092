/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::answering(sql)` - Always succeeds with the given text
 * - `MockProvider::scripted(..)` - Replays a queue of results in order
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Always fails with an error
 *
 * Every request is recorded so tests can inspect the prompt that was sent.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{Completion, CompletionRequest, Provider};
use crate::errors::ProviderError;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with the same text
    Answer(String),
    /// Fails intermittently (every Nth request) with a transient error
    Intermittent { fail_every: usize, text: String },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64, text: String },
}

/// Mock provider for exercising the translator without network access
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior once the script is exhausted
    behavior: MockBehavior,
    /// Results replayed before falling back to `behavior`
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every request received
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            script: Arc::new(Mutex::new(VecDeque::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider that always answers with `text`
    pub fn answering(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Answer(text.into()))
    }

    /// Create a mock that replays `script`, then fails
    pub fn scripted(script: Vec<Result<String, ProviderError>>) -> Self {
        let provider = Self::failing();
        provider.script.lock().extend(script);
        provider
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize, text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every, text: text.into() })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after `delay_ms`
    pub fn slow(delay_ms: u64, text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Slow { delay_ms, text: text.into() })
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request, if any
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().last().cloned()
    }
}

fn answer(text: &str, request: &CompletionRequest) -> Completion {
    Completion {
        text: text.to_string(),
        prompt_tokens: Some(request.prompt.len() as u64),
        completion_tokens: Some(text.len() as u64),
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let scripted = self.script.lock().pop_front();
        if let Some(result) = scripted {
            return result.map(|text| answer(&text, &request));
        }

        match &self.behavior {
            MockBehavior::Answer(text) => Ok(answer(text, &request)),

            MockBehavior::Intermittent { fail_every, text } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(answer(text, &request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 400,
            }),

            MockBehavior::Empty => Ok(Completion::text("")),

            MockBehavior::Slow { delay_ms, text } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(answer(text, &request))
            }
        }
    }

    async fn test_connection(&self, _model: &str) -> Result<(), ProviderError> {
        if !self.script.lock().is_empty() {
            return Ok(());
        }
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("mock offline".to_string())),
            _ => Ok(()),
        }
    }
}
