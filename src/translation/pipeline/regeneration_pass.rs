/*!
 * Regeneration pass: re-translating batches the reviewer flagged.
 *
 * Each round re-translates every still-flagged batch in one flat group
 * bounded by the stage size. Feedback accumulates across attempts, so the
 * n-th attempt sees the reviewer's notes and every earlier failure.
 * A successful regeneration is accepted without another review.
 */

use log::{info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::translation::capability::TranslationContext;

use super::planner::{BatchKey, Plan};
use super::scheduler::StageScheduler;
use super::state::{
    DegradedBatch, ProgressCallback, ReviewVerdict, WorkflowPhase, WorkflowProgress, WorkflowState,
};

/// What the regeneration pass did
#[derive(Debug, Clone, Default)]
pub struct RegenerationReport {
    /// Rounds executed
    pub rounds: u32,
    /// Batches that were successfully regenerated
    pub regenerated: Vec<BatchKey>,
    /// Batches still flagged when the pass ended
    pub degraded: Vec<DegradedBatch>,
}

/// Re-translates flagged batches with reviewer feedback
pub struct RegenerationPass {
    scheduler: StageScheduler,
    max_attempts: u32,
    concurrency: usize,
    cancel: CancellationToken,
}

impl RegenerationPass {
    /// Create a regeneration pass
    pub fn new(
        scheduler: StageScheduler,
        max_attempts: u32,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            scheduler,
            max_attempts,
            concurrency: concurrency.max(1),
            cancel,
        }
    }

    /// Regenerate flagged batches in `state` until they pass or run out of attempts.
    pub async fn run(
        &self,
        plan: &Plan,
        state: &mut WorkflowState,
        deadline: Option<Instant>,
        progress: Option<&ProgressCallback>,
    ) -> RegenerationReport {
        let mut report = RegenerationReport::default();

        // Reviewer feedback opens each flagged batch's history
        for key in state.flagged() {
            let feedback = state
                .verdicts
                .get(&key)
                .map(|v| v.feedback.clone())
                .unwrap_or_default();
            state.push_feedback(&key, &feedback);
        }

        for round in 1..=self.max_attempts {
            if self.cancel.is_cancelled() {
                warn!("[{}] Regeneration stopped: run cancelled", state.target_language);
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!("[{}] Regeneration stopped: run deadline reached", state.target_language);
                break;
            }

            let candidates: Vec<BatchKey> = state
                .flagged()
                .into_iter()
                .filter(|key| state.attempts(key) < self.max_attempts)
                .collect();
            if candidates.is_empty() {
                break;
            }

            info!(
                "[{}] Regeneration round {}: {} batches",
                state.target_language,
                round,
                candidates.len()
            );

            let mut jobs = Vec::with_capacity(candidates.len());
            let mut attempts = Vec::with_capacity(candidates.len());
            for key in &candidates {
                let Some(batch) = plan.batch(key) else {
                    continue;
                };
                let attempt = state.increment_attempts(key);
                let context = TranslationContext::regeneration(
                    &state.target_language,
                    key.as_str(),
                    attempt,
                    state.feedback(key),
                );
                attempts.push((key.clone(), attempt));
                jobs.push((batch.clone(), context));
            }

            let total = jobs.len();
            let mut results = self.scheduler.run_group(jobs, self.concurrency, deadline).await;
            report.rounds = round;
            let mut succeeded = 0;

            for (key, attempt) in attempts {
                let Some(result) = results.remove(&key) else {
                    continue;
                };
                if result.is_success() {
                    state.commit_result(result);
                    state
                        .verdicts
                        .insert(key.clone(), ReviewVerdict::pass(key.clone()));
                    report.regenerated.push(key);
                    succeeded += 1;
                } else {
                    let message = format!(
                        "Regeneration attempt {} failed: {}",
                        attempt,
                        result.error_message()
                    );
                    warn!("[{}] {}: {}", state.target_language, key, message);
                    state.push_feedback(&key, &message);
                    state.commit_result(result);
                }
            }

            if let Some(callback) = progress {
                callback(WorkflowProgress::new(
                    &state.target_language,
                    WorkflowPhase::Regenerating,
                    succeeded,
                    total,
                    format!("Regeneration round {} complete", round),
                ));
            }
        }

        for key in state.flagged() {
            let Some(batch) = plan.batch(&key) else {
                continue;
            };
            let reason = state
                .feedback_history
                .get(&key)
                .and_then(|history| history.last().cloned())
                .unwrap_or_else(|| "flagged by review".to_string());
            let translated = state.result(&key).is_some_and(|r| r.is_success());

            warn!(
                "[{}] {} degraded after {} attempts: {}",
                state.target_language,
                key,
                state.attempts(&key),
                reason
            );

            report.degraded.push(DegradedBatch {
                batch_key: key.clone(),
                section_ids: batch.section_ids(),
                attempts: state.attempts(&key),
                reason,
                translated,
            });
        }

        report
    }
}
