/*!
 * Review pass: one verdict per planned batch.
 *
 * Failed batches are flagged without asking the reviewer. Successful
 * batches are first checked against local character limits (when enabled)
 * and then reviewed by the capability, concurrently and bounded by the
 * stage size. A reviewer that errors or times out flags the batch.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::translation::capability::{ReviewContext, TranslationCapability};
use crate::validation::LengthValidator;

use super::planner::{BatchKey, Plan};
use super::scheduler::effective_timeout;
use super::state::{ReviewVerdict, WorkflowState};

/// Verdicts for a whole plan plus overall notes
#[derive(Debug, Clone, Default)]
pub struct ReviewReport {
    /// One verdict per planned batch
    pub verdicts: HashMap<BatchKey, ReviewVerdict>,
    /// Overall notes
    pub notes: Vec<String>,
}

impl ReviewReport {
    /// Number of batches flagged for regeneration
    pub fn flagged_count(&self) -> usize {
        self.verdicts.values().filter(|v| v.needs_regeneration()).count()
    }
}

/// Reviews translated batches
#[derive(Clone)]
pub struct ReviewPass {
    capability: Arc<dyn TranslationCapability>,
    concurrency: usize,
    per_batch_timeout: Duration,
    length_validator: Option<LengthValidator>,
    cancel: CancellationToken,
}

impl ReviewPass {
    /// Create a review pass
    pub fn new(
        capability: Arc<dyn TranslationCapability>,
        concurrency: usize,
        per_batch_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            capability,
            concurrency: concurrency.max(1),
            per_batch_timeout,
            length_validator: None,
            cancel,
        }
    }

    /// Check character limits before asking the reviewer
    pub fn with_length_validator(mut self, validator: LengthValidator) -> Self {
        self.length_validator = Some(validator);
        self
    }

    /// Review every planned batch against its current result.
    pub async fn review(
        &self,
        plan: &Plan,
        state: &WorkflowState,
        deadline: Option<Instant>,
    ) -> ReviewReport {
        let target_language = state.target_language.as_str();
        let mut verdicts = HashMap::with_capacity(plan.batch_count());
        let mut to_review = Vec::new();
        let mut length_flags = 0;

        for batch in plan.batches() {
            let key = batch.key.clone();
            let result = match state.result(&key) {
                Some(result) if result.is_success() => result,
                Some(result) => {
                    let feedback = format!("Previous attempt failed: {}", result.error_message());
                    verdicts.insert(key.clone(), ReviewVerdict::regenerate(key, feedback));
                    continue;
                }
                None => {
                    verdicts.insert(
                        key.clone(),
                        ReviewVerdict::regenerate(key, "Batch has not been translated"),
                    );
                    continue;
                }
            };

            if let Some(validator) = &self.length_validator {
                let check = validator.validate_sections(&batch.sections, &result.translated_sections);
                if !check.passed {
                    length_flags += 1;
                    debug!("{} violates character limits", key);
                    verdicts.insert(key.clone(), ReviewVerdict::regenerate(key, check.feedback()));
                    continue;
                }
            }

            to_review.push((batch, result));
        }

        let reviewed: Vec<ReviewVerdict> = stream::iter(to_review)
            .map(|(batch, result)| {
                let capability = Arc::clone(&self.capability);
                let cancel = self.cancel.clone();
                let context = ReviewContext::new(target_language, batch.key.as_str());
                let timeout = effective_timeout(self.per_batch_timeout, deadline);

                async move {
                    let key = batch.key.clone();
                    let call = capability.review_batch(&batch.sections, &result.translated_sections, &context);
                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => {
                            return ReviewVerdict::regenerate(key, "Review cancelled");
                        }
                        outcome = tokio::time::timeout(timeout, call) => outcome,
                    };

                    match outcome {
                        Ok(Ok(assessment)) if assessment.passed => ReviewVerdict::pass(key),
                        Ok(Ok(assessment)) => ReviewVerdict::regenerate(key, assessment.feedback),
                        Ok(Err(e)) => {
                            warn!("Review of {} failed: {}", key, e);
                            ReviewVerdict::regenerate(key, format!("Review failed: {}", e))
                        }
                        Err(_) => {
                            warn!("Review of {} timed out", key);
                            ReviewVerdict::regenerate(
                                key,
                                format!("Review timed out after {}ms", timeout.as_millis()),
                            )
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for verdict in reviewed {
            verdicts.insert(verdict.batch_key.clone(), verdict);
        }

        let passed = verdicts.values().filter(|v| !v.needs_regeneration()).count();
        let mut notes = vec![format!(
            "{}/{} batches passed review",
            passed,
            verdicts.len()
        )];
        if length_flags > 0 {
            notes.push(format!("{} batches exceeded character limits", length_flags));
        }

        info!("[{}] Review: {}", target_language, notes.join("; "));

        ReviewReport { verdicts, notes }
    }
}
