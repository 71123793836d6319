/*!
 * Provider-specific concurrency tuning.
 *
 * Stage size and inter-stage delay are the two knobs that shape the load a
 * run puts on a provider. This module provides tuned defaults for each
 * provider based on its rate limits and whether it runs locally.
 */

use crate::app_config::TranslationProvider;

/// Provider-specific concurrency profile with tuned defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Batches per stage
    pub recommended_stage_size: usize,
    /// Pause between stages in milliseconds
    pub inter_stage_delay_ms: u64,
    /// Target requests per minute, when the provider is rate limited
    pub target_rpm: Option<u32>,
}

impl ProviderProfile {
    /// Get the optimal profile for a given provider
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            TranslationProvider::Ollama => Self {
                // Local model, a single GPU serves requests mostly in sequence
                recommended_stage_size: 2,
                inter_stage_delay_ms: 0,
                target_rpm: None,
            },
            TranslationProvider::OpenAI => Self {
                recommended_stage_size: 4,
                inter_stage_delay_ms: 500,
                target_rpm: Some(60),
            },
            TranslationProvider::Anthropic => Self {
                recommended_stage_size: 3,
                inter_stage_delay_ms: 1000,
                target_rpm: Some(45),
            },
            TranslationProvider::LMStudio => Self {
                recommended_stage_size: 2,
                inter_stage_delay_ms: 0,
                target_rpm: None,
            },
            TranslationProvider::Mock => Self {
                recommended_stage_size: 8,
                inter_stage_delay_ms: 0,
                target_rpm: None,
            },
        }
    }

    /// Get the effective stage size, respecting any user override
    pub fn effective_stage_size(&self, user_override: Option<usize>) -> usize {
        user_override.filter(|k| *k > 0).unwrap_or(self.recommended_stage_size)
    }

    /// Smallest inter-stage delay that keeps a full stage under the target rate
    pub fn rate_limited_delay_ms(&self, stage_size: usize) -> u64 {
        match self.target_rpm {
            Some(rpm) if rpm > 0 => (60_000 / rpm as u64) * stage_size as u64,
            _ => self.inter_stage_delay_ms,
        }
    }
}
