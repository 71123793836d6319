/*!
 * Provider implementations for different LLM backends.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API and OpenAI-compatible servers such as LM Studio
 * - Anthropic: Anthropic API integration
 * - Mock: Scripted provider for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// A single completion request, independent of the backend
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model name
    pub model: String,

    /// System prompt
    pub system: Option<String>,

    /// User prompt
    pub prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum number of tokens to generate
    pub max_tokens: u32,

    /// Ask the backend for a JSON-only answer when it supports it
    pub json_output: bool,
}

impl CompletionRequest {
    /// Create a request with default sampling settings
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: 4096,
            json_output: false,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request JSON output
    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// A completion answer with optional token usage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,

    /// Number of prompt tokens, when reported
    pub prompt_tokens: Option<u64>,

    /// Number of generated tokens, when reported
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Display name of the backend
    fn name(&self) -> &str;

    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider with a given model
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError>;
}

/// Map a non-success HTTP status and body to a provider error
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Map a transport error to a provider error
pub(crate) fn request_error(error: reqwest::Error) -> ProviderError {
    if error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else if error.is_decode() {
        ProviderError::ParseError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}
