/*!
 * Mock provider implementations for testing.
 *
 * The mock understands the JSON requests built by the prompt module and
 * answers them the way a well-behaved model would:
 * - translation requests get every item prefixed with `[<language>] `
 * - review requests pass
 * - refinement requests are echoed unchanged
 *
 * Other behaviors simulate failing, empty, malformed or slow backends.
 */

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};
use crate::translation::prompts::templates::{TASK_REFINE, TASK_REVIEW, TASK_TRANSLATE};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper answer
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns text that is not JSON
    Malformed,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns non-JSON text
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Answer a prompt-module JSON request the way a cooperative model would
    pub fn answer(prompt: &str) -> String {
        let Ok(request) = serde_json::from_str::<Value>(prompt) else {
            return format!("[TRANSLATED] {}", prompt);
        };
        let language = request["target_language"].as_str().unwrap_or("xx");

        match request["task"].as_str() {
            Some(TASK_TRANSLATE) => sections_answer(&request, |text| format!("[{}] {}", language, text)),
            Some(TASK_REFINE) => sections_answer(&request, str::to_string),
            Some(TASK_REVIEW) => json!({"passed": true}).to_string(),
            _ => format!("[TRANSLATED] {}", prompt),
        }
    }

    fn respond(&self, request: &CompletionRequest) -> CompletionResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => Self::answer(&request.prompt),
        };
        CompletionResponse {
            prompt_tokens: Some(request.prompt.len() as u64 / 4),
            completion_tokens: Some(text.len() as u64 / 4),
            text,
        }
    }
}

fn sections_answer(request: &Value, map: impl Fn(&str) -> String) -> String {
    let sections: Vec<Value> = request["sections"]
        .as_array()
        .map(|sections| {
            sections
                .iter()
                .map(|section| {
                    let items: Vec<String> = section["items"]
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .map(|item| map(item["text"].as_str().unwrap_or_default()))
                                .collect()
                        })
                        .unwrap_or_default();
                    json!({"section_id": section["section_id"], "items": items})
                })
                .collect()
        })
        .unwrap_or_default();

    json!({ "sections": sections }).to_string()
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Malformed => Ok(CompletionResponse {
                text: "I'm sorry, I can only answer in prose today.".to_string(),
                prompt_tokens: Some(10),
                completion_tokens: Some(10),
            }),

            MockBehavior::Empty => Ok(CompletionResponse::default()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(&request))
            }
        }
    }

    async fn test_connection(&self, _model: &str) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("mock offline".to_string())),
            _ => Ok(()),
        }
    }
}
