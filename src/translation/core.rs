/*!
 * Core translation service implementation.
 *
 * This module contains the `TranslationService`, the provider-backed
 * implementation of `TranslationCapability`. It turns sections into JSON
 * prompts, sends them to an LLM provider with retry and backoff, and parses
 * the JSON answers back into sections.
 */

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::{CapabilityError, ProviderError};
use crate::providers::anthropic::Anthropic;
use crate::providers::mock::MockProvider;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::{CompletionRequest, Provider};
use crate::translation::capability::{
    ReviewAssessment, ReviewContext, TranslationCapability, TranslationContext, conform_batch_output,
};
use crate::translation::document::{ContentItem, Section, SectionTree};
use crate::translation::prompts::templates::TranslatedSection;
use crate::translation::prompts::{
    ReviewResponse, SectionsResponse, TranslationPromptBuilder, build_refinement_prompt,
    build_review_prompt, extract_json,
};

use super::cache::{CacheKey, TranslationCache};

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Number of provider calls that returned an answer
    pub requests: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::with_provider_info(String::new(), String::new())
    }
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            requests: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
            model,
        }
    }

    /// Record one answered request
    pub fn record(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>, duration: Duration) {
        let prompt = prompt_tokens.unwrap_or(0);
        let completion = completion_tokens.unwrap_or(0);
        self.prompt_tokens += prompt;
        self.completion_tokens += completion;
        self.total_tokens += prompt + completion;
        self.requests += 1;
        self.api_duration += duration;
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a one-line summary of token usage
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) | {} requests | {} prompt + {} completion = {} tokens | API time {:.1}s | {:.0} tokens/min",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.api_duration.as_secs_f64(),
            self.tokens_per_minute()
        )
    }
}

/// Parse an endpoint string into a scheme-qualified host and a port
fn parse_endpoint(endpoint: &str) -> Result<(String, u16)> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?;

    let port = url
        .port_or_known_default()
        .ok_or_else(|| anyhow!("Invalid port in endpoint: {}", endpoint))?;

    Ok((format!("{}://{}", url.scheme(), host), port))
}

/// Build the provider client for the active provider of a configuration
pub fn build_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>> {
    let endpoint = config.get_endpoint();
    let timeout = config.get_timeout_secs();

    let provider: Arc<dyn Provider> = match config.provider {
        ConfigTranslationProvider::Ollama => {
            let (host, port) = parse_endpoint(&endpoint)
                .with_context(|| format!("Invalid Ollama endpoint: {}", endpoint))?;
            Arc::new(Ollama::new(host, port, timeout))
        }
        ConfigTranslationProvider::OpenAI => {
            Arc::new(OpenAI::new(config.get_api_key(), endpoint, timeout))
        }
        ConfigTranslationProvider::LMStudio => Arc::new(OpenAI::lm_studio(endpoint, timeout)),
        ConfigTranslationProvider::Anthropic => {
            Arc::new(Anthropic::new(config.get_api_key(), endpoint, timeout))
        }
        ConfigTranslationProvider::Mock => Arc::new(MockProvider::working()),
    };

    Ok(provider)
}

/// Provider-backed translate/review/refine capability
#[derive(Clone)]
pub struct TranslationService {
    /// LLM backend
    provider: Arc<dyn Provider>,

    /// Model name sent with every request
    model: String,

    /// Sampling temperature
    temperature: f32,

    /// Generation limit per request
    max_tokens: u32,

    /// Extra attempts for retryable provider errors
    retry_count: u32,

    /// Base backoff, doubled on each retry
    retry_backoff_ms: u64,

    /// Extra instructions for translation requests
    custom_instructions: String,

    /// Batch translation cache
    cache: TranslationCache,

    /// Accumulated token usage, shared between clones
    usage: Arc<Mutex<TokenUsageStats>>,
}

impl TranslationService {
    /// Create a service for the active provider of a configuration
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let provider = build_provider(config)?;
        let common = &config.common;

        Ok(Self::with_provider(provider, config.get_model())
            .with_temperature(common.temperature)
            .with_max_tokens(config.get_max_tokens())
            .with_retry(common.retry_count, common.retry_backoff_ms)
            .with_custom_instructions(&common.custom_instructions)
            .with_cache(TranslationCache::new(common.enable_cache)))
    }

    /// Create a service over an existing provider
    pub fn with_provider(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        let usage = TokenUsageStats::with_provider_info(provider.name().to_string(), model.clone());
        Self {
            provider,
            model,
            temperature: 0.3,
            max_tokens: 4096,
            retry_count: 3,
            retry_backoff_ms: 1000,
            custom_instructions: String::new(),
            cache: TranslationCache::default(),
            usage: Arc::new(Mutex::new(usage)),
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the generation limit
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set retry count and base backoff
    pub fn with_retry(mut self, retry_count: u32, retry_backoff_ms: u64) -> Self {
        self.retry_count = retry_count;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    /// Set extra instructions for translation requests
    pub fn with_custom_instructions(mut self, instructions: &str) -> Self {
        self.custom_instructions = instructions.to_string();
        self
    }

    /// Replace the cache
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    /// The batch cache
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Snapshot of the accumulated token usage
    pub fn token_usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// Provider display name
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Test the connection to the provider
    pub async fn test_connection(&self) -> Result<()> {
        self.provider
            .test_connection(&self.model)
            .await
            .with_context(|| format!("Failed to connect to {}", self.provider.name()))
    }

    /// Send one request, retrying retryable failures with exponential backoff
    async fn complete_with_retry(&self, system: String, prompt: String) -> Result<String, ProviderError> {
        let request = CompletionRequest::new(&self.model, prompt)
            .system(system)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .json();

        let mut attempt = 0;
        loop {
            let started = Instant::now();
            match self.provider.complete(request.clone()).await {
                Ok(response) => {
                    self.usage.lock().record(
                        response.prompt_tokens,
                        response.completion_tokens,
                        started.elapsed(),
                    );
                    if response.text.trim().is_empty() {
                        return Err(ProviderError::ParseError(format!(
                            "{} returned an empty response",
                            self.provider.name()
                        )));
                    }
                    return Ok(response.text);
                }
                Err(e) if e.is_retryable() && attempt < self.retry_count => {
                    let backoff = self.retry_backoff_ms.saturating_mul(1 << attempt.min(16));
                    warn!(
                        "{} request failed (attempt {}/{}), retrying in {}ms: {}",
                        self.provider.name(),
                        attempt + 1,
                        self.retry_count + 1,
                        backoff,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, CapabilityError> {
    let json = extract_json(text)
        .ok_or_else(|| CapabilityError::MalformedOutput("no JSON object in response".to_string()))?;
    serde_json::from_str(json).map_err(|e| CapabilityError::MalformedOutput(e.to_string()))
}

fn into_sections(answer: Vec<TranslatedSection>) -> Vec<Section> {
    answer
        .into_iter()
        .map(|section| {
            let items = section
                .items
                .into_iter()
                .map(|item| ContentItem::new("", &item.into_text()))
                .collect();
            Section::new(&section.section_id, "", items)
        })
        .collect()
}

#[async_trait]
impl TranslationCapability for TranslationService {
    async fn translate_batch(
        &self,
        sections: &[Section],
        context: &TranslationContext,
    ) -> Result<Vec<Section>, CapabilityError> {
        let key = CacheKey::new(sections, &context.target_language, &context.feedback_history);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let (system, user) = TranslationPromptBuilder::new(&context.target_language)
            .with_sections(sections)
            .with_feedback(context.attempt, &context.feedback_history)
            .with_custom_instructions(&self.custom_instructions)
            .build();

        debug!(
            "[{}] Requesting translation of {} (attempt {})",
            context.target_language, context.batch_key, context.attempt
        );
        let text = self.complete_with_retry(system, user).await?;
        let answer: SectionsResponse = parse_json(&text)?;
        let translated = conform_batch_output(sections, into_sections(answer.sections))?;

        self.cache.store(key, &translated);
        Ok(translated)
    }

    async fn review_batch(
        &self,
        original: &[Section],
        translated: &[Section],
        context: &ReviewContext,
    ) -> Result<ReviewAssessment, CapabilityError> {
        let (system, user) = build_review_prompt(&context.target_language, original, translated);
        let text = self.complete_with_retry(system, user).await?;
        let answer: ReviewResponse = parse_json(&text)?;

        Ok(if answer.passed {
            ReviewAssessment::pass()
        } else {
            let feedback = answer
                .feedback
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| "Reviewer rejected the translation without details".to_string());
            ReviewAssessment::regenerate(feedback)
        })
    }

    async fn refine_document(
        &self,
        document: &SectionTree,
        target_language: &str,
    ) -> Result<SectionTree, CapabilityError> {
        let (system, user) = build_refinement_prompt(target_language, document);
        let text = self.complete_with_retry(system, user).await?;
        let answer: SectionsResponse = parse_json(&text)?;

        Ok(SectionTree::new(into_sections(answer.sections)))
    }
}
