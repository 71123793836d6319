/*!
 * Staged parallel translation pipeline.
 *
 * The pipeline processes a content tree through these passes:
 * 1. **Planning**: Split sections into keyed batches and bounded stages
 * 2. **Staging**: Translate each stage's batches concurrently behind a barrier
 * 3. **Review**: Collect one pass/regenerate verdict per batch
 * 4. **Regeneration**: Re-translate flagged batches with cumulative feedback
 * 5. **Refinement**: Harmonize the whole document in one call
 */

pub mod orchestrator;
pub mod planner;
pub mod refinement_pass;
pub mod regeneration_pass;
pub mod review_pass;
pub mod scheduler;
pub mod state;

// Re-export types used externally
pub use orchestrator::{BatchSummary, FinalResult, RunSummary, WorkflowConfig, WorkflowOrchestrator};
pub use planner::{Batch, BatchKey, BatchPlanner, Plan, Stage};
pub use refinement_pass::{IntegrityError, RefinementOutcome, RefinementPass};
pub use regeneration_pass::{RegenerationPass, RegenerationReport};
pub use review_pass::{ReviewPass, ReviewReport};
pub use scheduler::StageScheduler;
pub use state::{
    BatchError, BatchResult, BatchStatus, DegradedBatch, ProgressCallback, ReviewVerdict, Verdict,
    WorkflowPhase, WorkflowProgress, WorkflowState,
};
