/*!
 * Workflow orchestrator for staged parallel translation.
 *
 * A run moves through these phases:
 * 1. Planning: split the content tree into batches and stages
 * 2. Staging: translate each stage's batches concurrently, one stage at a time
 * 3. Reviewing: one verdict per batch
 * 4. Regenerating: re-translate flagged batches with feedback
 * 5. Refining: one whole-document consistency pass
 *
 * Batch failures never abort a run. The caller gets a `FinalResult`, possibly
 * with degraded batches, or a single `WorkflowError` when nothing usable exists.
 */

use futures::future::join_all;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::{ErrorKind, WorkflowError};
use crate::translation::capability::TranslationCapability;
use crate::translation::document::SectionTree;
use crate::validation::LengthValidator;

use super::planner::{BatchKey, BatchPlanner, Plan};
use super::refinement_pass::{RefinementOutcome, RefinementPass};
use super::regeneration_pass::RegenerationPass;
use super::review_pass::ReviewPass;
use super::scheduler::StageScheduler;
use super::state::{
    BatchError, BatchStatus, DegradedBatch, ProgressCallback, WorkflowPhase, WorkflowProgress,
    WorkflowState,
};

fn default_batch_concurrency() -> usize {
    3
}

fn default_max_regeneration_attempts() -> u32 {
    2
}

fn default_stage_delay_ms() -> u64 {
    500
}

fn default_per_batch_timeout_ms() -> u64 {
    120_000
}

fn default_per_run_timeout_ms() -> u64 {
    600_000
}

fn default_sections_per_batch() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Configuration for a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Maximum batches per stage, and the bound for review and regeneration concurrency
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Regeneration attempts per flagged batch
    #[serde(default = "default_max_regeneration_attempts")]
    pub max_regeneration_attempts: u32,

    /// Pause between stages in milliseconds
    #[serde(default = "default_stage_delay_ms")]
    pub stage_delay_ms: u64,

    /// Timeout of each capability call in milliseconds
    #[serde(default = "default_per_batch_timeout_ms")]
    pub per_batch_timeout_ms: u64,

    /// Deadline for reviewing, regenerating and refining in milliseconds
    #[serde(default = "default_per_run_timeout_ms")]
    pub per_run_timeout_ms: u64,

    /// Consecutive sections grouped into one batch
    #[serde(default = "default_sections_per_batch")]
    pub sections_per_batch: usize,

    /// Whether to run the refinement pass
    #[serde(default = "default_true")]
    pub enable_refinement: bool,

    /// Whether to flag batches that exceed character limits before review
    #[serde(default)]
    pub enforce_length_limits: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: default_batch_concurrency(),
            max_regeneration_attempts: default_max_regeneration_attempts(),
            stage_delay_ms: default_stage_delay_ms(),
            per_batch_timeout_ms: default_per_batch_timeout_ms(),
            per_run_timeout_ms: default_per_run_timeout_ms(),
            sections_per_batch: default_sections_per_batch(),
            enable_refinement: true,
            enforce_length_limits: false,
        }
    }
}

impl WorkflowConfig {
    /// Fast configuration: wider stages, one regeneration round, no refinement.
    pub fn fast() -> Self {
        Self {
            batch_concurrency: 6,
            max_regeneration_attempts: 1,
            stage_delay_ms: 0,
            enable_refinement: false,
            ..Default::default()
        }
    }

    /// Quality-focused configuration: narrower stages, more retries, length checks.
    pub fn quality() -> Self {
        Self {
            batch_concurrency: 2,
            max_regeneration_attempts: 3,
            stage_delay_ms: 1000,
            enable_refinement: true,
            enforce_length_limits: true,
            ..Default::default()
        }
    }

    /// Set the stage size.
    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency;
        self
    }

    /// Set the regeneration bound.
    pub fn with_max_regeneration_attempts(mut self, attempts: u32) -> Self {
        self.max_regeneration_attempts = attempts;
        self
    }

    /// Set the pause between stages.
    pub fn with_stage_delay_ms(mut self, delay_ms: u64) -> Self {
        self.stage_delay_ms = delay_ms;
        self
    }

    /// Set the per-call timeout.
    pub fn with_per_batch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.per_batch_timeout_ms = timeout_ms;
        self
    }

    /// Set the run deadline.
    pub fn with_per_run_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.per_run_timeout_ms = timeout_ms;
        self
    }

    /// Set how many sections go into each batch.
    pub fn with_sections_per_batch(mut self, sections_per_batch: usize) -> Self {
        self.sections_per_batch = sections_per_batch;
        self
    }

    /// Enable or disable refinement.
    pub fn with_refinement(mut self, enabled: bool) -> Self {
        self.enable_refinement = enabled;
        self
    }

    /// Enable or disable character limit checks.
    pub fn with_length_limits(mut self, enabled: bool) -> Self {
        self.enforce_length_limits = enabled;
        self
    }

    /// Check that all sizing values are usable.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_concurrency == 0 {
            anyhow::bail!("workflow.batch_concurrency must be at least 1");
        }
        if self.sections_per_batch == 0 {
            anyhow::bail!("workflow.sections_per_batch must be at least 1");
        }
        if self.per_batch_timeout_ms == 0 {
            anyhow::bail!("workflow.per_batch_timeout_ms must be greater than 0");
        }
        if self.per_run_timeout_ms == 0 {
            anyhow::bail!("workflow.per_run_timeout_ms must be greater than 0");
        }
        Ok(())
    }

    /// One-line description of the settings.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("Stage size: {}", self.batch_concurrency),
            format!("Sections/batch: {}", self.sections_per_batch),
            format!("Max regenerations: {}", self.max_regeneration_attempts),
        ];
        if self.stage_delay_ms > 0 {
            parts.push(format!("Stage delay: {}ms", self.stage_delay_ms));
        }
        parts.push(format!(
            "Timeouts: {}s/batch, {}s/run",
            self.per_batch_timeout_ms / 1000,
            self.per_run_timeout_ms / 1000
        ));
        if self.enforce_length_limits {
            parts.push("Length limits".to_string());
        }
        if !self.enable_refinement {
            parts.push("No refinement".to_string());
        }
        parts.join(" | ")
    }

    fn per_batch_timeout(&self) -> Duration {
        Duration::from_millis(self.per_batch_timeout_ms)
    }

    fn per_run_timeout(&self) -> Duration {
        Duration::from_millis(self.per_run_timeout_ms)
    }
}

/// Per-batch line of a run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Key of the batch
    pub batch_key: BatchKey,
    /// Sections of the batch
    pub section_ids: Vec<String>,
    /// Status of the current result
    pub status: BatchStatus,
    /// Regeneration attempts made
    pub regeneration_attempts: u32,
    /// Item counts per item type
    pub item_types: BTreeMap<String, usize>,
    /// Error of the current result, if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchError>,
}

/// Report of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Identifier of the run
    pub run_id: String,
    /// Target language of the run
    pub target_language: String,
    /// Number of planned batches
    pub batch_count: usize,
    /// Number of planned stages
    pub stage_count: usize,
    /// Per-batch details in plan order
    pub batches: Vec<BatchSummary>,
    /// Batches included without an accepted translation
    pub degraded: Vec<DegradedBatch>,
    /// How the final tree was produced
    pub refinement: RefinementOutcome,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// Overall reviewer notes
    pub review_notes: Vec<String>,
    /// Wall-clock duration
    pub duration: Duration,
}

impl RunSummary {
    /// Number of batches whose current result succeeded
    pub fn translated_batches(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.status == BatchStatus::Succeeded)
            .count()
    }

    /// Whether any batch is degraded
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// One-line description of the run.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        parts.push(format!("Language: {}", self.target_language));
        parts.push(format!("Duration: {:.2}s", self.duration.as_secs_f32()));
        parts.push(format!(
            "Batches: {}/{} translated in {} stages",
            self.translated_batches(),
            self.batch_count,
            self.stage_count
        ));

        let regenerations: u32 = self.batches.iter().map(|b| b.regeneration_attempts).sum();
        if regenerations > 0 {
            parts.push(format!("Regenerations: {}", regenerations));
        }
        if self.is_degraded() {
            parts.push(format!("Degraded: {}", self.degraded.len()));
        }

        parts.push(match &self.refinement {
            RefinementOutcome::Refined => "Refinement: applied".to_string(),
            RefinementOutcome::Skipped => "Refinement: skipped".to_string(),
            RefinementOutcome::Fallback { kind, .. } => format!("Refinement: fallback ({})", kind),
        });

        if self.cancelled {
            parts.push("Cancelled".to_string());
        }

        parts.join(" | ")
    }
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct FinalResult {
    /// Translated content tree, same sections in the same order as the input
    pub tree: SectionTree,
    /// Run report
    pub summary: RunSummary,
}

/// Drives workflow runs against a translation capability.
pub struct WorkflowOrchestrator {
    capability: Arc<dyn TranslationCapability>,
    config: WorkflowConfig,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator.
    pub fn new(capability: Arc<dyn TranslationCapability>, config: WorkflowConfig) -> Self {
        Self {
            capability,
            config,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Receive progress events.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Token that cancels every run of this orchestrator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get the workflow configuration.
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Translate several languages concurrently, one independent run each.
    pub async fn translate_many(
        &self,
        tree: &SectionTree,
        target_languages: &[String],
    ) -> Vec<(String, Result<FinalResult, WorkflowError>)> {
        let runs = target_languages.iter().map(|language| async move {
            let result = self.translate(tree, language).await;
            (language.clone(), result)
        });
        join_all(runs).await
    }

    /// Translate a content tree into one target language.
    pub async fn translate(
        &self,
        tree: &SectionTree,
        target_language: &str,
    ) -> Result<FinalResult, WorkflowError> {
        let mut state = WorkflowState::new(target_language);

        // Phase 1: Planning
        let plan = match BatchPlanner::new(self.config.batch_concurrency)
            .with_sections_per_batch(self.config.sections_per_batch)
            .plan(tree)
        {
            Ok(plan) => plan,
            Err(e) => {
                error!("[{}] Planning failed: {}", target_language, e);
                state.transition(WorkflowPhase::Aborted);
                return Err(WorkflowError::InvalidPlan(e));
            }
        };

        info!(
            "[{}] Run {}: planned {} sections into {} batches across {} stages",
            target_language,
            state.run_id,
            tree.len(),
            plan.batch_count(),
            plan.stages.len()
        );
        self.emit(&state, 0, plan.batch_count(), "Plan ready");

        // Phase 2: Staging
        let scheduler = StageScheduler::new(
            Arc::clone(&self.capability),
            self.config.per_batch_timeout(),
            self.cancel.clone(),
        );
        scheduler
            .run_stages(
                &plan,
                &mut state,
                Duration::from_millis(self.config.stage_delay_ms),
                self.progress.as_ref(),
            )
            .await;

        if state.succeeded_count() == 0 {
            state.transition(WorkflowPhase::Aborted);
            if self.cancel.is_cancelled() {
                warn!("[{}] Run cancelled before any batch was translated", target_language);
                return Err(WorkflowError::Cancelled {
                    target_language: target_language.to_string(),
                });
            }
            let details = plan
                .batches()
                .filter_map(|b| state.result(&b.key).map(|r| format!("{}: {}", b.key, r.error_message())))
                .take(3)
                .collect::<Vec<_>>()
                .join("; ");
            error!("[{}] Every batch failed: {}", target_language, details);
            return Err(WorkflowError::NoUsableOutput {
                target_language: target_language.to_string(),
                failed_batches: plan.batch_count(),
                details,
            });
        }

        if self.cancel.is_cancelled() {
            warn!("[{}] Run cancelled, returning partial result", target_language);
            let degraded = untranslated_batches(&plan, &state);
            let partial = RefinementPass::assemble(&plan, &state);
            ensure_complete(tree, &partial, target_language)?;
            state.transition(WorkflowPhase::Done);
            let outcome = PassOutcome {
                degraded,
                refinement: RefinementOutcome::Skipped,
                cancelled: true,
            };
            return Ok(self.finish(partial, &plan, &state, outcome));
        }

        let deadline = tokio::time::Instant::now() + self.config.per_run_timeout();

        // Phase 3: Reviewing
        state.transition(WorkflowPhase::Reviewing);
        self.emit(&state, 0, plan.batch_count(), "Reviewing batches");
        let mut review = ReviewPass::new(
            Arc::clone(&self.capability),
            self.config.batch_concurrency,
            self.config.per_batch_timeout(),
            self.cancel.clone(),
        );
        if self.config.enforce_length_limits {
            review = review.with_length_validator(LengthValidator::new());
        }
        let report = review.review(&plan, &state, Some(deadline)).await;
        let flagged = report.flagged_count();
        state.verdicts = report.verdicts;
        state.review_notes = report.notes;
        self.emit(
            &state,
            plan.batch_count() - flagged,
            plan.batch_count(),
            format!("{} batches flagged for regeneration", flagged),
        );

        // Phase 4: Regenerating
        state.transition(WorkflowPhase::Regenerating);
        let regeneration = RegenerationPass::new(
            scheduler,
            self.config.max_regeneration_attempts,
            self.config.batch_concurrency,
            self.cancel.clone(),
        );
        let regeneration_report = regeneration
            .run(&plan, &mut state, Some(deadline), self.progress.as_ref())
            .await;

        // Phase 5: Refining
        let assembled = RefinementPass::assemble(&plan, &state);
        let cancelled = self.cancel.is_cancelled();
        let (final_tree, refinement) = if cancelled || !self.config.enable_refinement {
            (assembled, RefinementOutcome::Skipped)
        } else {
            state.transition(WorkflowPhase::Refining);
            self.emit(&state, 0, 1, "Refining document");
            RefinementPass::new(Arc::clone(&self.capability), self.cancel.clone())
                .refine(assembled, target_language, Some(deadline))
                .await
        };

        if let Err(e) = ensure_complete(tree, &final_tree, target_language) {
            error!("[{}] {}", target_language, e);
            state.transition(WorkflowPhase::Aborted);
            return Err(e);
        }

        state.transition(WorkflowPhase::Done);
        let outcome = PassOutcome {
            degraded: regeneration_report.degraded,
            refinement,
            cancelled,
        };
        let result = self.finish(final_tree, &plan, &state, outcome);
        info!("[{}] {}", target_language, result.summary.summary());
        self.emit(&state, plan.batch_count(), plan.batch_count(), "Done");

        Ok(result)
    }

    fn finish(
        &self,
        tree: SectionTree,
        plan: &Plan,
        state: &WorkflowState,
        outcome: PassOutcome,
    ) -> FinalResult {
        let batches = plan
            .batches()
            .map(|batch| {
                let result = state.result(&batch.key);
                BatchSummary {
                    batch_key: batch.key.clone(),
                    section_ids: batch.section_ids(),
                    status: result.map_or(BatchStatus::Failed, |r| r.status),
                    regeneration_attempts: state.attempts(&batch.key),
                    item_types: batch.item_type_counts(),
                    error: result.and_then(|r| r.error.clone()),
                }
            })
            .collect();

        FinalResult {
            tree,
            summary: RunSummary {
                run_id: state.run_id.clone(),
                target_language: state.target_language.clone(),
                batch_count: plan.batch_count(),
                stage_count: plan.stages.len(),
                batches,
                degraded: outcome.degraded,
                refinement: outcome.refinement,
                cancelled: outcome.cancelled,
                review_notes: state.review_notes.clone(),
                duration: state.started_at.elapsed(),
            },
        }
    }

    fn emit(&self, state: &WorkflowState, completed: usize, total: usize, message: impl Into<String>) {
        if let Some(callback) = &self.progress {
            callback(WorkflowProgress::new(
                &state.target_language,
                state.phase,
                completed,
                total,
                message,
            ));
        }
    }
}

/// What the passes after staging decided about the run
struct PassOutcome {
    degraded: Vec<DegradedBatch>,
    refinement: RefinementOutcome,
    cancelled: bool,
}

/// Check that `output` holds every section of `source` exactly once
fn ensure_complete(
    source: &SectionTree,
    output: &SectionTree,
    target_language: &str,
) -> Result<(), WorkflowError> {
    if output.has_same_sections(source) {
        return Ok(());
    }

    let source_ids = source.section_id_set();
    let output_ids = output.section_id_set();
    let mut problems = Vec::new();

    let mut missing: Vec<&str> = source_ids.difference(&output_ids).copied().collect();
    missing.sort_unstable();
    if !missing.is_empty() {
        problems.push(format!("missing {}", missing.join(", ")));
    }
    let mut extra: Vec<&str> = output_ids.difference(&source_ids).copied().collect();
    extra.sort_unstable();
    if !extra.is_empty() {
        problems.push(format!("unexpected {}", extra.join(", ")));
    }
    if output.len() != output_ids.len() {
        problems.push(format!("{} sections for {} distinct ids", output.len(), output_ids.len()));
    }

    Err(WorkflowError::IncompleteOutput {
        target_language: target_language.to_string(),
        details: problems.join("; "),
    })
}

/// Batches without a successful result, reported as degraded with source text
fn untranslated_batches(plan: &Plan, state: &WorkflowState) -> Vec<DegradedBatch> {
    plan.batches()
        .filter_map(|batch| {
            let result = state.result(&batch.key);
            if result.is_some_and(|r| r.is_success()) {
                return None;
            }
            Some(DegradedBatch {
                batch_key: batch.key.clone(),
                section_ids: batch.section_ids(),
                attempts: state.attempts(&batch.key),
                reason: result
                    .map(|r| r.error_message())
                    .unwrap_or_else(|| ErrorKind::Cancelled.to_string()),
                translated: false,
            })
        })
        .collect()
}
