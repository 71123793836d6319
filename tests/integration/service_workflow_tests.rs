/*!
 * Integration tests running the provider-backed service through the workflow
 */

use anyhow::Result;
use std::sync::Arc;

use sitewai::errors::WorkflowError;
use sitewai::providers::mock::MockProvider;
use sitewai::translation::{TranslationService, WebsiteContent, WorkflowOrchestrator};

use crate::common::{self, test_workflow};

fn orchestrator(provider: &MockProvider, retries: u32) -> WorkflowOrchestrator {
    let service = TranslationService::with_provider(Arc::new(provider.clone()), "mock-model").with_retry(retries, 1);
    WorkflowOrchestrator::new(Arc::new(service), test_workflow(2))
}

/// Test a complete run over a content file
#[tokio::test]
async fn test_workflow_withMockProvider_shouldTranslateEveryItem() -> Result<()> {
    let content = WebsiteContent::from_json_str(common::sample_sections_json())?;
    let provider = MockProvider::working();

    let result = orchestrator(&provider, 0).translate(&content.tree, "French").await?;

    assert_eq!(result.tree.section_ids(), content.tree.section_ids());
    assert_eq!(result.tree.sections[0].items[0].value, "[French] Welcome to Acme");
    assert_eq!(result.tree.sections[0].items[2].item_type, "button");
    assert_eq!(result.tree.sections[1].items[1].value, "[French] Fast | Built for speed");
    assert!(result.summary.refinement.is_refined());

    // One translation and one review per batch, plus the refinement
    assert_eq!(provider.request_count(), 3 + 3 + 1);

    let rendered = content.render(&result.tree, Some("French"));
    assert_eq!(rendered["sections"][2]["content"][0]["value"], "[French] All rights reserved.");
    Ok(())
}

/// Test that transient provider errors are absorbed by retries
#[tokio::test]
async fn test_workflow_withIntermittentProvider_shouldStillTranslateEverything() -> Result<()> {
    let tree = common::build_tree(5);
    let provider = MockProvider::intermittent(3);

    let result = orchestrator(&provider, 2).translate(&tree, "German").await?;

    assert_eq!(result.summary.translated_batches(), 5);
    assert!(!result.summary.is_degraded());
    assert!(result
        .tree
        .sections
        .iter()
        .all(|s| s.items.iter().all(|i| i.value.starts_with("[German] "))));
    Ok(())
}

/// Test a provider that never answers in the expected format
#[tokio::test]
async fn test_workflow_withMalformedProvider_shouldReturnNoUsableOutput() {
    let provider = MockProvider::malformed();

    let result = orchestrator(&provider, 0).translate(&common::build_tree(3), "French").await;

    assert!(matches!(result, Err(WorkflowError::NoUsableOutput { failed_batches: 3, .. })));
    assert_eq!(provider.request_count(), 3);
}

/// Test a run over the grouped page shape
#[tokio::test]
async fn test_workflow_pagesShape_shouldRenderTranslatedGroups() -> Result<()> {
    let content = WebsiteContent::from_json_str(common::sample_pages_json())?;
    let provider = MockProvider::working();

    let result = orchestrator(&provider, 0).translate(&content.tree, "Spanish").await?;
    let rendered = content.render(&result.tree, Some("Spanish"));

    assert_eq!(rendered["website_metadata"]["language"], "Spanish");
    assert_eq!(rendered["pages"]["group_1"]["item_1"]["value"], "[Spanish] Welcome");
    assert_eq!(rendered["pages"]["group_2"]["item_1"]["value"], "[Spanish] Write us");
    assert_eq!(rendered["pages"]["group_2"]["item_1"]["type"], "button");
    Ok(())
}
