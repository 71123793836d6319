/*!
 * Per-run workflow state.
 *
 * `WorkflowState` is created at the start of a run, owned by the task that
 * drives the run and dropped when it ends. Batch tasks never touch it; they
 * hand their `BatchResult` back and the owner commits it here.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::errors::ErrorKind;
use crate::translation::document::Section;

use super::planner::BatchKey;

/// Outcome of one translation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// The capability returned a well-formed translation
    Succeeded,
    /// The attempt failed, timed out or was cancelled
    Failed,
}

/// Error attached to a failed batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Error classification
    pub kind: ErrorKind,
    /// Human readable message
    pub message: String,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of one translation attempt of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Key of the batch
    pub batch_key: BatchKey,
    /// Translated sections; empty when failed
    pub translated_sections: Vec<Section>,
    /// Attempt outcome
    pub status: BatchStatus,
    /// Error, when failed
    pub error: Option<BatchError>,
}

impl BatchResult {
    /// Successful attempt
    pub fn succeeded(batch_key: BatchKey, translated_sections: Vec<Section>) -> Self {
        Self {
            batch_key,
            translated_sections,
            status: BatchStatus::Succeeded,
            error: None,
        }
    }

    /// Failed attempt
    pub fn failed(batch_key: BatchKey, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            batch_key,
            translated_sections: Vec::new(),
            status: BatchStatus::Failed,
            error: Some(BatchError {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Whether the attempt succeeded
    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Succeeded
    }

    /// Error message, or an empty string
    pub fn error_message(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

/// Reviewer decision for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Accept the translation
    Pass,
    /// Translate the batch again
    Regenerate,
}

/// Review outcome of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    /// Key of the batch
    pub batch_key: BatchKey,
    /// Decision
    pub verdict: Verdict,
    /// Guidance for regeneration
    pub feedback: String,
}

impl ReviewVerdict {
    /// Passing verdict
    pub fn pass(batch_key: BatchKey) -> Self {
        Self {
            batch_key,
            verdict: Verdict::Pass,
            feedback: String::new(),
        }
    }

    /// Verdict requesting regeneration
    pub fn regenerate(batch_key: BatchKey, feedback: impl Into<String>) -> Self {
        Self {
            batch_key,
            verdict: Verdict::Regenerate,
            feedback: feedback.into(),
        }
    }

    /// Whether regeneration is requested
    pub fn needs_regeneration(&self) -> bool {
        self.verdict == Verdict::Regenerate
    }
}

/// A batch that is part of the output without an accepted translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedBatch {
    /// Key of the batch
    pub batch_key: BatchKey,
    /// Sections of the batch
    pub section_ids: Vec<String>,
    /// Regeneration attempts made
    pub attempts: u32,
    /// Last feedback or error
    pub reason: String,
    /// Whether the output holds a translation (the last successful one) or the source text
    pub translated: bool,
}

/// Phases of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowPhase {
    /// Building the batch plan
    Planning,
    /// Running the stage with the given index
    Staging(usize),
    /// Reviewing translated batches
    Reviewing,
    /// Regenerating flagged batches
    Regenerating,
    /// Whole-document refinement
    Refining,
    /// Run finished with a result
    Done,
    /// Run finished with an error
    Aborted,
}

impl WorkflowPhase {
    fn rank(&self) -> u8 {
        match self {
            Self::Planning => 0,
            Self::Staging(_) => 1,
            Self::Reviewing => 2,
            Self::Regenerating => 3,
            Self::Refining => 4,
            Self::Done => 5,
            Self::Aborted => 6,
        }
    }

    /// Whether the phase ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Whether moving to `next` is a legal forward transition.
    ///
    /// Phases may be skipped but never revisited. Any non-terminal phase may abort.
    pub fn can_transition_to(&self, next: WorkflowPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Self::Aborted) => true,
            (Self::Staging(current), Self::Staging(next)) => next > *current,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "Planning"),
            Self::Staging(i) => write!(f, "Staging({})", i),
            Self::Reviewing => write!(f, "Reviewing"),
            Self::Regenerating => write!(f, "Regenerating"),
            Self::Refining => write!(f, "Refining"),
            Self::Done => write!(f, "Done"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Progress event emitted while a run advances
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowProgress {
    /// Target language of the run
    pub target_language: String,
    /// Phase the event belongs to
    pub phase: WorkflowPhase,
    /// Batches resolved in the current phase
    pub completed_batches: usize,
    /// Batches to resolve in the current phase
    pub total_batches: usize,
    /// Status message
    pub message: String,
}

impl WorkflowProgress {
    /// Create a progress event
    pub fn new(
        target_language: &str,
        phase: WorkflowPhase,
        completed_batches: usize,
        total_batches: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            target_language: target_language.to_string(),
            phase,
            completed_batches,
            total_batches,
            message: message.into(),
        }
    }

    /// Completion of the current phase (0.0 - 1.0)
    pub fn fraction(&self) -> f32 {
        if self.total_batches == 0 {
            return 1.0;
        }
        self.completed_batches as f32 / self.total_batches as f32
    }
}

/// Progress callback shared by concurrent runs
pub type ProgressCallback = Arc<dyn Fn(WorkflowProgress) + Send + Sync>;

/// Mutable state of one workflow run
#[derive(Debug)]
pub struct WorkflowState {
    /// Identifier of the run, used in logs and summaries
    pub run_id: String,
    /// Target language of the run
    pub target_language: String,
    /// Current phase
    pub phase: WorkflowPhase,
    /// Index of the last stage started
    pub stage_index: usize,
    /// Current result per batch
    pub results: HashMap<BatchKey, BatchResult>,
    /// Latest verdict per batch
    pub verdicts: HashMap<BatchKey, ReviewVerdict>,
    /// Regeneration attempts made per batch
    pub regeneration_attempts: HashMap<BatchKey, u32>,
    /// Cumulative feedback per batch, oldest first
    pub feedback_history: HashMap<BatchKey, Vec<String>>,
    /// Overall reviewer notes
    pub review_notes: Vec<String>,
    /// Run start
    pub started_at: Instant,
}

impl WorkflowState {
    /// Fresh state for a run
    pub fn new(target_language: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            target_language: target_language.to_string(),
            phase: WorkflowPhase::Planning,
            stage_index: 0,
            results: HashMap::new(),
            verdicts: HashMap::new(),
            regeneration_attempts: HashMap::new(),
            feedback_history: HashMap::new(),
            review_notes: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Move to `next`, returning false (and staying put) if the transition is illegal
    pub fn transition(&mut self, next: WorkflowPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            warn!(
                "[{}] Ignoring illegal phase transition {} -> {}",
                self.target_language, self.phase, next
            );
            return false;
        }
        debug!("[{}] Phase {} -> {}", self.target_language, self.phase, next);
        if let WorkflowPhase::Staging(index) = next {
            self.stage_index = index;
        }
        self.phase = next;
        true
    }

    /// Commit a result as current for its batch.
    ///
    /// A failed attempt never replaces a successful one. Returns whether the
    /// result became current.
    pub fn commit_result(&mut self, result: BatchResult) -> bool {
        let keeps_success = !result.is_success()
            && self
                .results
                .get(&result.batch_key)
                .is_some_and(BatchResult::is_success);
        if keeps_success {
            return false;
        }
        self.results.insert(result.batch_key.clone(), result);
        true
    }

    /// Current result of a batch
    pub fn result(&self, key: &BatchKey) -> Option<&BatchResult> {
        self.results.get(key)
    }

    /// Regeneration attempts made for a batch
    pub fn attempts(&self, key: &BatchKey) -> u32 {
        self.regeneration_attempts.get(key).copied().unwrap_or(0)
    }

    /// Count one more regeneration attempt for a batch
    pub fn increment_attempts(&mut self, key: &BatchKey) -> u32 {
        let attempts = self.regeneration_attempts.entry(key.clone()).or_insert(0);
        *attempts += 1;
        *attempts
    }

    /// Append feedback to a batch's history, skipping empty entries
    pub fn push_feedback(&mut self, key: &BatchKey, feedback: &str) {
        if feedback.trim().is_empty() {
            return;
        }
        self.feedback_history
            .entry(key.clone())
            .or_default()
            .push(feedback.to_string());
    }

    /// Feedback history of a batch
    pub fn feedback(&self, key: &BatchKey) -> Vec<String> {
        self.feedback_history.get(key).cloned().unwrap_or_default()
    }

    /// Keys whose latest verdict asks for regeneration
    pub fn flagged(&self) -> Vec<BatchKey> {
        let mut keys: Vec<BatchKey> = self
            .verdicts
            .values()
            .filter(|v| v.needs_regeneration())
            .map(|v| v.batch_key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of batches with a successful current result
    pub fn succeeded_count(&self) -> usize {
        self.results.values().filter(|r| r.is_success()).count()
    }
}
