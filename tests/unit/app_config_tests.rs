/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use sitewai::app_config::{Config, LogLevel, TranslationProvider};
use sitewai::WorkflowConfig;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.target_languages, vec!["fr".to_string()]);
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert!(config.workflow.is_none());
    assert_eq!(config.log_level, LogLevel::Info);

    let ollama = config
        .translation
        .get_provider_config(&TranslationProvider::Ollama)
        .expect("Ollama provider config should exist");
    assert!(!ollama.model.is_empty());
    assert!(!ollama.endpoint.is_empty());

    assert_eq!(config.translation.common.retry_count, 3);
    assert!(config.translation.common.enable_cache);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.target_languages = vec!["fr".to_string(), "Notalanguage".to_string()];
    assert!(config.validate().is_err());
    config.target_languages = vec!["fr".to_string(), "German".to_string()];
    assert!(config.validate().is_ok());

    config.translation.provider = TranslationProvider::Anthropic;
    config.translation.active_provider_config_mut().api_key = String::new();
    assert!(config.validate().is_err());
    config.translation.active_provider_config_mut().api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());

    config.translation.common.temperature = 3.5;
    assert!(config.validate().is_err());
    config.translation.common.temperature = 0.3;

    config.workflow = Some(WorkflowConfig::default().with_batch_concurrency(0));
    assert!(config.validate().is_err());
}

/// Test that the mock provider needs no credentials
#[test]
fn test_config_mockProvider_shouldValidateWithoutKey() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Mock;

    assert!(config.validate().is_ok());
    assert_eq!(config.translation.get_model(), "mock");
}

/// Test that the workflow falls back to the provider profile
#[test]
fn test_workflowConfig_perProvider_shouldDifferInStageSize() {
    let mut config = Config::default();

    config.translation.provider = TranslationProvider::Ollama;
    let local = config.workflow_config();
    config.translation.provider = TranslationProvider::OpenAI;
    let hosted = config.workflow_config();

    assert!(hosted.batch_concurrency > local.batch_concurrency);
    assert!(hosted.stage_delay_ms > 0);

    config.workflow = Some(WorkflowConfig::default().with_batch_concurrency(7));
    assert_eq!(config.workflow_config().batch_concurrency, 7);
}

/// Test the stage size override against the provider's rate limit
#[test]
fn test_workflowConfigWithStageSize_widerThanRecommended_shouldPaceByRateLimit() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::OpenAI;

    // OpenAI: 4 batches per stage, 500ms pause, 60 requests per minute
    let recommended = config.workflow_config_with_stage_size(None);
    assert_eq!(recommended.batch_concurrency, 4);
    assert_eq!(recommended.stage_delay_ms, 500);

    let narrower = config.workflow_config_with_stage_size(Some(2));
    assert_eq!(narrower.batch_concurrency, 2);
    assert_eq!(narrower.stage_delay_ms, 500);

    let wider = config.workflow_config_with_stage_size(Some(6));
    assert_eq!(wider.batch_concurrency, 6);
    assert_eq!(wider.stage_delay_ms, 6_000);

    assert_eq!(config.workflow_config_with_stage_size(Some(0)).batch_concurrency, 4);

    config.translation.provider = TranslationProvider::Ollama;
    assert_eq!(config.workflow_config_with_stage_size(Some(6)).stage_delay_ms, 0);

    config.workflow = Some(WorkflowConfig::default().with_stage_delay_ms(250));
    let configured = config.workflow_config_with_stage_size(Some(9));
    assert_eq!(configured.batch_concurrency, 9);
    assert_eq!(configured.stage_delay_ms, 250);
}

/// Test saving and loading a configuration file
#[test]
fn test_config_saveAndLoad_shouldPreserveSettings() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_languages = vec!["de".to_string(), "es".to_string()];
    config.translation.provider = TranslationProvider::LMStudio;
    config.workflow = Some(WorkflowConfig::default().with_max_regeneration_attempts(4));
    config.save(&path)?;

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded.target_languages, config.target_languages);
    assert_eq!(loaded.translation.provider, TranslationProvider::LMStudio);
    assert_eq!(
        loaded.workflow.map(|w| w.max_regeneration_attempts),
        Some(4)
    );

    Ok(())
}

/// Test that a missing configuration file is created with defaults
#[test]
fn test_config_loadOrCreate_missingFile_shouldCreateDefault() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("fresh.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.target_languages, Config::default().target_languages);
    Ok(())
}

/// Test that a partial configuration file is filled with defaults
#[test]
fn test_config_partialFile_shouldUseDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "partial.json",
        r#"{"target_languages": ["ja"], "translation": {"provider": "openai"}}"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.target_languages, vec!["ja".to_string()]);
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");
    assert!(config.workflow.is_none());
    Ok(())
}

/// Test provider parsing from strings
#[test]
fn test_translationProvider_fromStr_withVariousCases_shouldParse() {
    assert_eq!("Ollama".parse::<TranslationProvider>().unwrap(), TranslationProvider::Ollama);
    assert_eq!("LMSTUDIO".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert_eq!("mock".parse::<TranslationProvider>().unwrap(), TranslationProvider::Mock);
    assert!("bard".parse::<TranslationProvider>().is_err());
}
