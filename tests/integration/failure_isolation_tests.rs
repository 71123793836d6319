/*!
 * Integration tests for failure containment, timeouts and cancellation
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use sitewai::errors::{PlanError, WorkflowError};
use sitewai::translation::pipeline::{BatchKey, BatchStatus, RefinementOutcome};
use sitewai::translation::{SectionTree, WorkflowOrchestrator};
use tokio_util::sync::CancellationToken;

use crate::common::mock_capability::{RefineMode, ScriptedCapability, TranslateStep};
use crate::common::{self, test_workflow};

/// Test that a failing batch does not affect its siblings in the same stage
#[tokio::test]
async fn test_translate_siblingFails_shouldNotAffectOtherBatches() {
    let capability = Arc::new(
        ScriptedCapability::new()
            .translate("s1", vec![TranslateStep::Fail("rate limited".to_string()); 3])
            .refine(RefineMode::Echo),
    );
    let tree = common::build_tree(4);
    let orchestrator = WorkflowOrchestrator::new(capability.clone(), test_workflow(4));

    let result = orchestrator.translate(&tree, "fr").await.unwrap();

    for id in ["s0", "s2", "s3"] {
        assert!(result.tree.get(id).unwrap().items[0].value.starts_with("[fr] "), "{}", id);
        assert_eq!(capability.calls_for(id).len(), 1, "{}", id);
    }
    assert_eq!(result.tree.get("s1"), tree.get("s1"));
    assert_eq!(result.summary.degraded.len(), 1);
}

/// Test that a panicking batch is contained like any other failure
#[tokio::test]
async fn test_translate_batchPanics_shouldRecordFailureForThatBatchOnly() {
    let capability = Arc::new(
        ScriptedCapability::new()
            .translate("s2", vec![TranslateStep::Panic, TranslateStep::Panic])
            .refine(RefineMode::Echo),
    );
    let tree = common::build_tree(4);
    let config = test_workflow(4).with_max_regeneration_attempts(1);
    let orchestrator = WorkflowOrchestrator::new(capability.clone(), config);

    let result = orchestrator.translate(&tree, "fr").await.unwrap();

    assert_eq!(result.summary.translated_batches(), 3);
    let s2 = result
        .summary
        .batches
        .iter()
        .find(|b| b.batch_key == BatchKey::from("batch_s2"))
        .unwrap();
    assert_eq!(s2.status, BatchStatus::Failed);
    assert_eq!(s2.regeneration_attempts, 1);
    assert_eq!(result.tree.get("s2"), tree.get("s2"));
    assert!(!result.summary.degraded[0].translated);
}

/// Test output that does not match the batch structure
#[tokio::test]
async fn test_translate_malformedOutput_shouldFailBatchAndRegenerate() {
    let capability = Arc::new(ScriptedCapability::new().translate("s0", vec![TranslateStep::Malformed]));
    let tree = common::build_tree(2);
    let orchestrator = WorkflowOrchestrator::new(capability.clone(), test_workflow(2));

    let result = orchestrator.translate(&tree, "fr").await.unwrap();

    let calls = capability.calls_for("s0");
    assert_eq!(calls.len(), 2);
    assert!(calls[1].feedback[0].contains("expected 2 items"));
    assert_eq!(result.summary.translated_batches(), 2);
}

/// Test a batch that never answers
#[tokio::test]
async fn test_translate_batchHangs_shouldTimeOutAndRegenerate() {
    let capability = Arc::new(ScriptedCapability::new().translate("s0", vec![TranslateStep::Hang]));
    let tree = common::build_tree(3);
    let config = test_workflow(3).with_per_batch_timeout_ms(150);
    let orchestrator = WorkflowOrchestrator::new(capability.clone(), config);

    let started = Instant::now();
    let result = orchestrator.translate(&tree, "fr").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    let calls = capability.calls_for("s0");
    assert_eq!(calls.len(), 2);
    assert!(calls[0].finished.is_none());
    assert!(calls[1].feedback[0].contains("timeout"));
    assert!(calls[1].feedback[0].contains("150ms"));
    assert_eq!(result.summary.translated_batches(), 3);
    assert!(!result.summary.is_degraded());
}

/// Test a run in which every batch fails
#[tokio::test]
async fn test_translate_everyBatchFails_shouldReturnNoUsableOutput() {
    let capability = Arc::new(
        ScriptedCapability::new()
            .translate("s0", vec![TranslateStep::Fail("down".to_string())])
            .translate("s1", vec![TranslateStep::Fail("down".to_string())])
            .translate("s2", vec![TranslateStep::Fail("down".to_string())]),
    );
    let tree = common::build_tree(3);
    let orchestrator = WorkflowOrchestrator::new(capability.clone(), test_workflow(2));

    let result = orchestrator.translate(&tree, "fr").await;

    match result {
        Err(WorkflowError::NoUsableOutput {
            target_language,
            failed_batches,
            details,
        }) => {
            assert_eq!(target_language, "fr");
            assert_eq!(failed_batches, 3);
            assert!(details.contains("down"));
        }
        other => panic!("expected NoUsableOutput, got {:?}", other.map(|r| r.summary)),
    }
    assert_eq!(capability.review_count(), 0);
    assert_eq!(capability.refine_count(), 0);
}

/// Test rejection of input that cannot be planned
#[tokio::test]
async fn test_translate_invalidTree_shouldFailBeforeAnyCall() {
    let capability = Arc::new(ScriptedCapability::new());
    let orchestrator = WorkflowOrchestrator::new(capability.clone(), test_workflow(2));

    let empty = orchestrator.translate(&SectionTree::default(), "fr").await;
    assert!(matches!(empty, Err(WorkflowError::InvalidPlan(PlanError::EmptyTree))));

    let duplicate = SectionTree::new(vec![common::section("a", &["x"]), common::section("a", &["y"])]);
    let result = orchestrator.translate(&duplicate, "fr").await;
    assert!(matches!(result, Err(WorkflowError::InvalidPlan(PlanError::DuplicateSection(_)))));

    assert_eq!(capability.translate_count(), 0);
}

/// Test a run cancelled before it starts
#[tokio::test]
async fn test_translate_cancelledBeforeStart_shouldReturnCancelled() {
    let capability = Arc::new(ScriptedCapability::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let orchestrator =
        WorkflowOrchestrator::new(capability.clone(), test_workflow(2)).with_cancellation(cancel);

    let result = orchestrator.translate(&common::build_tree(3), "fr").await;

    assert!(matches!(result, Err(WorkflowError::Cancelled { .. })));
    assert_eq!(capability.translate_count(), 0);
}

/// Test a run cancelled while later stages are still running
#[tokio::test]
async fn test_translate_cancelledMidRun_shouldReturnPartialResult() {
    let capability = Arc::new(
        ScriptedCapability::new()
            .translate("s2", vec![TranslateStep::Hang])
            .translate("s3", vec![TranslateStep::Hang]),
    );
    let tree = common::build_tree(4);
    let config = test_workflow(2).with_per_batch_timeout_ms(30_000);
    let orchestrator = WorkflowOrchestrator::new(capability.clone(), config);

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let result = orchestrator.translate(&tree, "fr").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(result.summary.cancelled);
    assert_eq!(result.summary.refinement, RefinementOutcome::Skipped);
    assert_eq!(capability.review_count(), 0);
    assert_eq!(capability.refine_count(), 0);

    assert_eq!(result.tree.section_ids(), tree.section_ids());
    assert!(result.tree.get("s0").unwrap().items[0].value.starts_with("[fr] "));
    assert_eq!(result.tree.get("s3"), tree.get("s3"));

    let untranslated: Vec<&BatchKey> = result.summary.degraded.iter().map(|d| &d.batch_key).collect();
    assert_eq!(untranslated, vec![&BatchKey::from("batch_s2"), &BatchKey::from("batch_s3")]);
    assert!(result.summary.degraded.iter().all(|d| !d.translated));
}
