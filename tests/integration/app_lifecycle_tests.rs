/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use std::sync::Arc;

use sitewai::app_config::{Config, TranslationProvider};
use sitewai::app_controller::Controller;
use sitewai::file_utils::FileManager;

use crate::common::mock_capability::{ScriptedCapability, TranslateStep};
use crate::common::{self, test_workflow};

fn mock_config(languages: &[&str]) -> Config {
    common::init_test_logging();
    let mut config = Config::default();
    config.target_languages = languages.iter().map(|l| l.to_string()).collect();
    config.translation.provider = TranslationProvider::Mock;
    config.translation.common.retry_backoff_ms = 1;
    config.workflow = Some(test_workflow(2));
    config
}

/// Test the controller initialization with a valid config
#[test]
fn test_controller_withValidConfig_shouldInitialize() -> Result<()> {
    let controller = Controller::with_config(mock_config(&["fr"]))?;
    assert_eq!(controller.config().target_languages, vec!["fr".to_string()]);
    Ok(())
}

/// Test that invalid configurations are rejected up front
#[test]
fn test_controller_withUnknownLanguage_shouldFail() {
    assert!(Controller::with_config(mock_config(&["fr", "Notalanguage"])).is_err());
}

/// Test a full run writing one file per language
#[tokio::test]
async fn test_run_withMockProvider_shouldWriteOneFilePerLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_content(temp_dir.path(), "site.json")?;
    let output_dir = temp_dir.path().join("out");

    let controller = Controller::with_config(mock_config(&["fr", "German"]))?.with_progress(false);
    let outcomes = controller.run(input, output_dir.clone(), false).await?;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_written()));
    assert_eq!(outcomes[1].language.code, "de");

    let french: serde_json::Value =
        serde_json::from_str(&FileManager::read_to_string(output_dir.join("site.fr.json"))?)?;
    assert_eq!(french["target_language"], "French");
    assert_eq!(french["sections"][0]["content"][0]["value"], "[French] Welcome to Acme");
    assert_eq!(french["sections"][0]["content"][0]["type"], "header");

    let german: serde_json::Value =
        serde_json::from_str(&FileManager::read_to_string(output_dir.join("site.de.json"))?)?;
    assert_eq!(german["sections"][2]["content"][0]["value"], "[German] All rights reserved.");

    let summary = outcomes[0].summary.as_ref().unwrap();
    assert_eq!(summary.batch_count, 3);
    assert!(!summary.is_degraded());
    Ok(())
}

/// Test that existing outputs are kept unless forced
#[tokio::test]
async fn test_run_withExistingOutput_shouldRequireForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_content(temp_dir.path(), "site.json")?;
    let output_dir = temp_dir.path().to_path_buf();
    let existing = common::create_test_file(temp_dir.path(), "site.fr.json", "{}")?;

    let controller = Controller::with_config(mock_config(&["fr"]))?.with_progress(false);

    let outcomes = controller.run(input.clone(), output_dir.clone(), false).await?;
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].is_written());
    assert!(outcomes[0].error.as_deref().unwrap_or_default().contains("already exists"));
    assert_eq!(FileManager::read_to_string(&existing)?, "{}");

    let outcomes = controller.run(input, output_dir, true).await?;
    assert!(outcomes[0].is_written());
    assert!(FileManager::read_to_string(&existing)?.contains("[French]"));
    Ok(())
}

/// Test a run over the grouped page shape
#[tokio::test]
async fn test_run_withPagesShape_shouldKeepShape() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "home.json", common::sample_pages_json())?;

    let controller = Controller::with_config(mock_config(&["it"]))?.with_progress(false);
    controller.run(input, temp_dir.path().to_path_buf(), false).await?;

    let italian: serde_json::Value =
        serde_json::from_str(&FileManager::read_to_string(temp_dir.path().join("home.it.json"))?)?;
    assert_eq!(italian["website_metadata"]["language"], "Italian");
    assert_eq!(italian["website_metadata"]["site"], "acme");
    assert_eq!(italian["pages"]["name"], "Home");
    assert_eq!(italian["pages"]["group_1"]["item_1"]["value"], "[Italian] Welcome");
    Ok(())
}

/// Test a missing input file
#[test]
fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(mock_config(&["fr"]))?.with_progress(false);

    let result = tokio_test::block_on(async {
        controller
            .run(temp_dir.path().join("missing.json"), temp_dir.path().to_path_buf(), false)
            .await
    });

    assert!(result.is_err());
    Ok(())
}

/// Test a run in which no language can be translated
#[tokio::test]
async fn test_run_withFailingCapability_shouldFailWithoutWriting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_content(temp_dir.path(), "site.json")?;

    let capability = Arc::new(
        ["hero", "features", "footer"]
            .iter()
            .fold(ScriptedCapability::new(), |capability, id| {
                capability.translate(id, vec![TranslateStep::Fail("offline".to_string())])
            }),
    );
    let controller = Controller::with_config(mock_config(&["fr"]))?
        .with_capability(capability)
        .with_progress(false);

    let result = controller.run(input, temp_dir.path().to_path_buf(), false).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("site.fr.json").exists());
    Ok(())
}

/// Test that a cancelled controller writes nothing it did not translate
#[test]
fn test_run_cancelledBeforeStart_shouldNotWriteOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_content(temp_dir.path(), "site.json")?;

    let controller = Controller::with_config(mock_config(&["fr"]))?.with_progress(false);
    controller.cancellation_token().cancel();

    let result = tokio_test::block_on(controller.run(input, temp_dir.path().to_path_buf(), false));

    assert!(result.is_err());
    assert!(!temp_dir.path().join("site.fr.json").exists());
    Ok(())
}
