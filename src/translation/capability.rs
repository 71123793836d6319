/*!
 * Contract between the translation workflow and whatever produces text.
 *
 * The workflow never talks to a model directly. It calls a
 * `TranslationCapability` to translate one batch of sections, to review a
 * translated batch, and to refine a whole translated document. Guidance for
 * a call (target language, regeneration feedback) travels in explicit
 * context values instead of shared mutable instructions.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CapabilityError;
use crate::translation::document::{Section, SectionTree};

/// Guidance passed with every `translate_batch` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationContext {
    /// Target language name or code
    pub target_language: String,

    /// Key of the batch being translated
    pub batch_key: String,

    /// 0 for the first translation, n for the n-th regeneration
    pub attempt: u32,

    /// Reviewer feedback and failure notes from earlier attempts, oldest first
    pub feedback_history: Vec<String>,
}

impl TranslationContext {
    /// Context for a first translation attempt
    pub fn new(target_language: &str, batch_key: &str) -> Self {
        Self {
            target_language: target_language.to_string(),
            batch_key: batch_key.to_string(),
            attempt: 0,
            feedback_history: Vec::new(),
        }
    }

    /// Context for a regeneration attempt
    pub fn regeneration(
        target_language: &str,
        batch_key: &str,
        attempt: u32,
        feedback_history: Vec<String>,
    ) -> Self {
        Self {
            target_language: target_language.to_string(),
            batch_key: batch_key.to_string(),
            attempt,
            feedback_history,
        }
    }

    /// Whether this call is a regeneration
    pub fn is_regeneration(&self) -> bool {
        self.attempt > 0
    }
}

/// Guidance passed with every `review_batch` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewContext {
    /// Target language name or code
    pub target_language: String,

    /// Key of the batch under review
    pub batch_key: String,
}

impl ReviewContext {
    /// Create a review context
    pub fn new(target_language: &str, batch_key: &str) -> Self {
        Self {
            target_language: target_language.to_string(),
            batch_key: batch_key.to_string(),
        }
    }
}

/// Reviewer's judgement of one translated batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAssessment {
    /// Whether the translation is acceptable as is
    pub passed: bool,

    /// Concrete guidance for a regeneration; may be empty when passed
    #[serde(default)]
    pub feedback: String,
}

impl ReviewAssessment {
    /// Accepting assessment
    pub fn pass() -> Self {
        Self {
            passed: true,
            feedback: String::new(),
        }
    }

    /// Rejecting assessment with guidance
    pub fn regenerate(feedback: impl Into<String>) -> Self {
        Self {
            passed: false,
            feedback: feedback.into(),
        }
    }
}

/// Text-producing operations the workflow depends on
///
/// Implementations must be shareable across tasks; the workflow holds them
/// behind an `Arc` and calls them concurrently.
#[async_trait]
pub trait TranslationCapability: Send + Sync {
    /// Translate the sections of one batch.
    ///
    /// The result must contain the same section identifiers, in the same
    /// order, with the same number of items per section.
    async fn translate_batch(
        &self,
        sections: &[Section],
        context: &TranslationContext,
    ) -> Result<Vec<Section>, CapabilityError>;

    /// Judge a translated batch against its source.
    async fn review_batch(
        &self,
        original: &[Section],
        translated: &[Section],
        context: &ReviewContext,
    ) -> Result<ReviewAssessment, CapabilityError>;

    /// Harmonize terminology and tone across a whole translated document.
    async fn refine_document(
        &self,
        document: &SectionTree,
        target_language: &str,
    ) -> Result<SectionTree, CapabilityError>;
}

/// Check a translate output against the batch it was produced for.
///
/// Returns the output with item types taken from the source sections.
pub fn conform_batch_output(
    source: &[Section],
    output: Vec<Section>,
) -> Result<Vec<Section>, CapabilityError> {
    if output.len() != source.len() {
        return Err(CapabilityError::MalformedOutput(format!(
            "expected {} sections, got {}",
            source.len(),
            output.len()
        )));
    }

    source
        .iter()
        .zip(output)
        .map(|(src, out)| {
            if out.section_id != src.section_id {
                return Err(CapabilityError::MalformedOutput(format!(
                    "expected section '{}', got '{}'",
                    src.section_id, out.section_id
                )));
            }
            let item_count = out.items.len();
            src.with_values(out.items.into_iter().map(|item| item.value))
                .ok_or_else(|| {
                    CapabilityError::MalformedOutput(format!(
                        "section '{}': expected {} items, got {}",
                        src.section_id,
                        src.items.len(),
                        item_count
                    ))
                })
        })
        .collect()
}
