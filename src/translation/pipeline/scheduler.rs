/*!
 * Stage scheduling: concurrent batch execution with a barrier between stages.
 *
 * Every batch runs in its own task and hands its `(BatchKey, BatchResult)`
 * pair back through a `JoinSet`. A batch that errors, times out, panics or
 * is cancelled is recorded as a failed result for its own key only; its
 * siblings keep running.
 */

use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ErrorKind;
use crate::translation::capability::{TranslationCapability, TranslationContext, conform_batch_output};

use super::planner::{Batch, BatchKey, Plan, Stage};
use super::state::{BatchResult, ProgressCallback, WorkflowPhase, WorkflowProgress, WorkflowState};

/// Runs batches against a translation capability
#[derive(Clone)]
pub struct StageScheduler {
    /// Capability shared by all batch tasks
    capability: Arc<dyn TranslationCapability>,

    /// Upper bound for each translate call
    per_batch_timeout: Duration,

    /// Run-wide cancellation
    cancel: CancellationToken,
}

impl StageScheduler {
    /// Create a scheduler
    pub fn new(
        capability: Arc<dyn TranslationCapability>,
        per_batch_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            capability,
            per_batch_timeout,
            cancel,
        }
    }

    /// Run every batch of a stage concurrently and wait for all of them.
    pub async fn run_stage(
        &self,
        stage: &Stage,
        target_language: &str,
    ) -> HashMap<BatchKey, BatchResult> {
        let jobs = stage
            .batches
            .iter()
            .map(|batch| {
                let context = TranslationContext::new(target_language, batch.key.as_str());
                (batch.clone(), context)
            })
            .collect();

        self.run_group(jobs, stage.len(), None).await
    }

    /// Run a flat group of batches with at most `limit` in flight.
    ///
    /// Each call is bounded by the per-batch timeout and, when given, by `deadline`.
    pub async fn run_group(
        &self,
        jobs: Vec<(Batch, TranslationContext)>,
        limit: usize,
        deadline: Option<Instant>,
    ) -> HashMap<BatchKey, BatchResult> {
        let semaphore = Arc::new(Semaphore::new(limit.max(1)));
        let mut pending: HashSet<BatchKey> = HashSet::with_capacity(jobs.len());
        let mut tasks = JoinSet::new();

        for (batch, context) in jobs {
            pending.insert(batch.key.clone());

            let capability = Arc::clone(&self.capability);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let per_batch_timeout = self.per_batch_timeout;

            tasks.spawn(async move {
                let key = batch.key.clone();
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => BatchResult::failed(
                        key.clone(),
                        ErrorKind::Cancelled,
                        "run cancelled before the batch resolved",
                    ),
                    result = async {
                        let _permit = match semaphore.acquire_owned().await {
                            Ok(permit) => permit,
                            Err(e) => {
                                return BatchResult::failed(batch.key.clone(), ErrorKind::Capability, e.to_string());
                            }
                        };
                        let timeout = effective_timeout(per_batch_timeout, deadline);
                        translate_with_timeout(capability.as_ref(), &batch, &context, timeout).await
                    } => result,
                };
                (key, result)
            });
        }

        let mut results = HashMap::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, result)) => {
                    pending.remove(&key);
                    results.insert(key, result);
                }
                Err(e) => {
                    error!("Batch task terminated abnormally: {}", e);
                }
            }
        }

        // Keys whose task died without handing back a result
        for key in pending {
            let kind = if self.cancel.is_cancelled() {
                ErrorKind::Cancelled
            } else {
                ErrorKind::Capability
            };
            results.insert(
                key.clone(),
                BatchResult::failed(key, kind, "batch task terminated without a result"),
            );
        }

        results
    }

    /// Run all stages of a plan in order, committing results into `state`.
    ///
    /// Stages after a cancellation are not started; their batches are
    /// recorded as cancelled so every planned key has a current result.
    pub async fn run_stages(
        &self,
        plan: &Plan,
        state: &mut WorkflowState,
        stage_delay: Duration,
        progress: Option<&ProgressCallback>,
    ) {
        let total_batches = plan.batch_count();
        let stage_count = plan.stages.len();
        let mut completed = 0;

        for stage in &plan.stages {
            if self.cancel.is_cancelled() {
                for batch in &stage.batches {
                    state.commit_result(BatchResult::failed(
                        batch.key.clone(),
                        ErrorKind::Cancelled,
                        "run cancelled before the stage started",
                    ));
                }
                continue;
            }

            state.transition(WorkflowPhase::Staging(stage.index));
            info!(
                "[{}] Stage {}/{}: {} batches",
                state.target_language,
                stage.index + 1,
                stage_count,
                stage.len()
            );

            let results = self.run_stage(stage, &state.target_language).await;
            let failed = results.values().filter(|r| !r.is_success()).count();
            for (_, result) in results {
                state.commit_result(result);
            }
            completed += stage.len();

            if failed > 0 {
                warn!(
                    "[{}] Stage {} finished with {} failed batches",
                    state.target_language,
                    stage.index + 1,
                    failed
                );
            }

            if let Some(callback) = progress {
                callback(WorkflowProgress::new(
                    &state.target_language,
                    WorkflowPhase::Staging(stage.index),
                    completed,
                    total_batches,
                    format!("Stage {}/{} complete", stage.index + 1, stage_count),
                ));
            }

            let is_last = stage.index + 1 == stage_count;
            if !is_last && !stage_delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(stage_delay) => {}
                }
            }
        }
    }
}

/// Translate one batch within `timeout`, checking the output shape.
pub async fn translate_with_timeout(
    capability: &dyn TranslationCapability,
    batch: &Batch,
    context: &TranslationContext,
    timeout: Duration,
) -> BatchResult {
    debug!(
        "Translating {} (attempt {})",
        batch.description(),
        context.attempt
    );

    let outcome = tokio::time::timeout(timeout, capability.translate_batch(&batch.sections, context)).await;

    let result = match outcome {
        Err(_) => BatchResult::failed(
            batch.key.clone(),
            ErrorKind::Timeout,
            format!("no response within {}ms", timeout.as_millis()),
        ),
        Ok(Err(e)) => BatchResult::failed(batch.key.clone(), ErrorKind::Capability, e.to_string()),
        Ok(Ok(sections)) => match conform_batch_output(&batch.sections, sections) {
            Ok(sections) => BatchResult::succeeded(batch.key.clone(), sections),
            Err(e) => BatchResult::failed(batch.key.clone(), ErrorKind::Capability, e.to_string()),
        },
    };

    if let Some(err) = &result.error {
        error!("{} failed: {}", batch.key, err);
    } else {
        debug!("{} translated", batch.key);
    }

    result
}

/// Per-call timeout clipped to what is left before `deadline`
pub fn effective_timeout(per_call: Duration, deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(deadline) => per_call.min(deadline.saturating_duration_since(Instant::now())),
        None => per_call,
    }
}
