/*!
 * Refinement pass: one whole-document harmonization call.
 *
 * The accepted batch translations are assembled into a single tree in plan
 * order and handed to the capability once. The refined tree is accepted only
 * if it holds exactly the assembled section identifiers with the same item
 * counts; otherwise the assembled tree is used unchanged.
 */

use log::{info, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ErrorKind;
use crate::translation::capability::TranslationCapability;
use crate::translation::document::{Section, SectionTree};

use super::planner::Plan;
use super::state::WorkflowState;

/// How the final tree was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefinementOutcome {
    /// The refined tree was accepted
    Refined,
    /// Refinement was disabled or not reached
    Skipped,
    /// Refinement failed; the assembled tree was used
    Fallback {
        /// Failure classification
        kind: ErrorKind,
        /// Failure description
        reason: String,
    },
}

impl RefinementOutcome {
    /// Whether the refined tree was used
    pub fn is_refined(&self) -> bool {
        matches!(self, Self::Refined)
    }
}

/// Ways a refined tree can disagree with its input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// A section of the input is missing
    #[error("refined document is missing section '{0}'")]
    MissingSection(String),

    /// A section not present in the input appeared
    #[error("refined document contains unexpected section '{0}'")]
    UnexpectedSection(String),

    /// A section appears more than once
    #[error("refined document contains section '{0}' more than once")]
    DuplicateSection(String),

    /// A section's item count changed
    #[error("section '{section_id}' has {actual} items, expected {expected}")]
    ItemCountMismatch {
        section_id: String,
        expected: usize,
        actual: usize,
    },
}

/// Runs the whole-document refinement call
#[derive(Clone)]
pub struct RefinementPass {
    capability: Arc<dyn TranslationCapability>,
    cancel: CancellationToken,
}

impl RefinementPass {
    /// Create a refinement pass
    pub fn new(capability: Arc<dyn TranslationCapability>, cancel: CancellationToken) -> Self {
        Self { capability, cancel }
    }

    /// Assemble current results into one tree in plan order.
    ///
    /// Batches without a successful result contribute their source sections.
    pub fn assemble(plan: &Plan, state: &WorkflowState) -> SectionTree {
        let sections = plan
            .batches()
            .flat_map(|batch| match state.result(&batch.key) {
                Some(result) if result.is_success() => result.translated_sections.clone(),
                _ => batch.sections.clone(),
            })
            .collect();
        SectionTree::new(sections)
    }

    /// Refine an assembled tree, falling back to it on any failure.
    pub async fn refine(
        &self,
        assembled: SectionTree,
        target_language: &str,
        deadline: Option<Instant>,
    ) -> (SectionTree, RefinementOutcome) {
        let call = self.capability.refine_document(&assembled, target_language);

        let outcome = match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => None,
                    outcome = tokio::time::timeout_at(deadline, call) => Some(outcome.ok()),
                }
            }
            None => {
                tokio::select! {
                    _ = self.cancel.cancelled() => None,
                    outcome = call => Some(Some(outcome)),
                }
            }
        };

        let fallback = |kind: ErrorKind, reason: String| {
            warn!("[{}] Refinement fell back to assembled document: {}", target_language, reason);
            RefinementOutcome::Fallback { kind, reason }
        };

        match outcome {
            None => {
                let outcome = fallback(ErrorKind::Cancelled, "run cancelled".to_string());
                (assembled, outcome)
            }
            Some(None) => {
                let outcome = fallback(ErrorKind::Timeout, "run deadline reached".to_string());
                (assembled, outcome)
            }
            Some(Some(Err(e))) => {
                let outcome = fallback(ErrorKind::Capability, e.to_string());
                (assembled, outcome)
            }
            Some(Some(Ok(refined))) => match conform_refined(&assembled, refined) {
                Ok(tree) => {
                    info!("[{}] Refinement accepted", target_language);
                    (tree, RefinementOutcome::Refined)
                }
                Err(e) => {
                    let outcome = fallback(ErrorKind::RefinementIntegrity, e.to_string());
                    (assembled, outcome)
                }
            },
        }
    }
}

/// Check a refined tree against its input and bring it into the input's order.
///
/// Item types are taken from the input, so refinement can only change values.
pub fn conform_refined(
    assembled: &SectionTree,
    refined: SectionTree,
) -> Result<SectionTree, IntegrityError> {
    let expected: HashSet<&str> = assembled.section_id_set();
    let mut by_id: HashMap<String, Section> = HashMap::with_capacity(refined.len());

    for section in refined.sections {
        if !expected.contains(section.section_id.as_str()) {
            return Err(IntegrityError::UnexpectedSection(section.section_id));
        }
        if by_id.contains_key(&section.section_id) {
            return Err(IntegrityError::DuplicateSection(section.section_id));
        }
        by_id.insert(section.section_id.clone(), section);
    }

    let sections = assembled
        .sections
        .iter()
        .map(|source| {
            let refined = by_id
                .remove(&source.section_id)
                .ok_or_else(|| IntegrityError::MissingSection(source.section_id.clone()))?;
            let actual = refined.items.len();
            source
                .with_values(refined.items.into_iter().map(|item| item.value))
                .ok_or(IntegrityError::ItemCountMismatch {
                    section_id: source.section_id.clone(),
                    expected: source.items.len(),
                    actual,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SectionTree::new(sections))
}
