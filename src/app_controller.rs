use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::language_utils::{self, TargetLanguage};
use crate::translation::pipeline::{ProgressCallback, RunSummary, WorkflowOrchestrator, WorkflowProgress};
use crate::translation::{TranslationCapability, TranslationService, WebsiteContent};

// @module: Application controller for website content translation

/// Outcome of one target language
#[derive(Debug, Clone)]
pub struct LanguageOutcome {
    /// Resolved target language
    pub language: TargetLanguage,
    /// Written file, when the run produced output
    pub output_path: Option<PathBuf>,
    /// Run report, when the run produced output
    pub summary: Option<RunSummary>,
    /// Failure or skip reason otherwise
    pub error: Option<String>,
}

impl LanguageOutcome {
    /// Whether a translated file was written
    pub fn is_written(&self) -> bool {
        self.output_path.is_some()
    }
}

/// Main application controller for website translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Capability override, the provider-backed service otherwise
    capability: Option<Arc<dyn TranslationCapability>>,
    // @field: Cancels every run started by this controller
    cancel: CancellationToken,
    // @field: Whether progress bars are drawn
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            capability: None,
            cancel: CancellationToken::new(),
            show_progress: true,
        })
    }

    /// Use a specific capability instead of building one from the config
    pub fn with_capability(mut self, capability: Arc<dyn TranslationCapability>) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that cancels the running translation
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Translate one content file into every configured target language
    pub async fn run(
        &self,
        input_file: PathBuf,
        output_dir: PathBuf,
        force_overwrite: bool,
    ) -> Result<Vec<LanguageOutcome>> {
        let start_time = std::time::Instant::now();

        if !FileManager::file_exists(&input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        FileManager::ensure_dir(&output_dir)?;

        let content = WebsiteContent::from_json_str(&FileManager::read_to_string(&input_file)?)
            .with_context(|| format!("Failed to parse content file: {:?}", input_file))?;
        info!(
            "Loaded {} sections ({} items) from {:?}",
            content.tree.len(),
            content.tree.item_count(),
            input_file
        );

        let mut outcomes = Vec::new();
        let mut pending: Vec<(TargetLanguage, PathBuf)> = Vec::new();
        for requested in &self.config.target_languages {
            let language = language_utils::resolve_language(requested)?;
            let output_path = FileManager::generate_output_path(&input_file, &output_dir, &language.code);
            if let Err(e) = FileManager::check_writable(&output_path, force_overwrite) {
                warn!("Skipping {}: {}", language.name, e);
                outcomes.push(LanguageOutcome {
                    language,
                    output_path: None,
                    summary: None,
                    error: Some(e.to_string()),
                });
                continue;
            }
            pending.push((language, output_path));
        }

        if pending.is_empty() {
            warn!("Nothing to translate, every output already exists");
            return Ok(outcomes);
        }

        let (capability, service) = self.capability()?;
        if let Some(service) = &service {
            service.test_connection().await?;
            info!(
                "Translating with {} ({})",
                service.provider_name(),
                self.config.translation.get_model()
            );
        }

        let names: Vec<String> = pending.iter().map(|(language, _)| language.name.clone()).collect();
        let multi_progress = MultiProgress::new();
        let orchestrator = WorkflowOrchestrator::new(capability, self.config.workflow_config())
            .with_cancellation(self.cancel.clone())
            .with_progress_callback(self.progress_callback(&multi_progress, &names));

        info!("Workflow: {}", orchestrator.config().summary());
        let results = orchestrator.translate_many(&content.tree, &names).await;

        for ((language, output_path), (_, result)) in pending.into_iter().zip(results) {
            match result {
                Ok(final_result) => {
                    let rendered = content.render(&final_result.tree, Some(&language.name));
                    FileManager::write_json(&output_path, &rendered)?;

                    info!("{}", final_result.summary.summary());
                    for degraded in &final_result.summary.degraded {
                        warn!(
                            "[{}] Degraded batch {} after {} attempts: {}",
                            language.name, degraded.batch_key, degraded.attempts, degraded.reason
                        );
                    }
                    info!("Wrote {:?}", output_path);

                    outcomes.push(LanguageOutcome {
                        language,
                        output_path: Some(output_path),
                        summary: Some(final_result.summary),
                        error: None,
                    });
                }
                Err(e) => {
                    error!("[{}] Translation failed: {}", language.name, e);
                    outcomes.push(LanguageOutcome {
                        language,
                        output_path: None,
                        summary: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if let Some(service) = &service {
            info!("{}", service.token_usage().summary());
        }
        info!(
            "Finished {} languages in {}",
            outcomes.len(),
            Self::format_duration(start_time.elapsed())
        );

        if !outcomes.iter().any(LanguageOutcome::is_written) {
            return Err(anyhow!("No target language could be translated"));
        }
        Ok(outcomes)
    }

    fn capability(&self) -> Result<(Arc<dyn TranslationCapability>, Option<TranslationService>)> {
        if let Some(capability) = &self.capability {
            return Ok((Arc::clone(capability), None));
        }
        let service = TranslationService::new(&self.config.translation)
            .context("Failed to create translation service")?;
        Ok((Arc::new(service.clone()), Some(service)))
    }

    fn progress_callback(&self, multi_progress: &MultiProgress, languages: &[String]) -> ProgressCallback {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {prefix:>12} [{bar:40.cyan/blue}] {pos}/{len} batches {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{prefix} [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░");

        let bars: HashMap<String, ProgressBar> = languages
            .iter()
            .map(|language| {
                let bar = if self.show_progress {
                    multi_progress.add(ProgressBar::new(0))
                } else {
                    ProgressBar::hidden()
                };
                bar.set_style(style.clone());
                bar.set_prefix(language.clone());
                (language.clone(), bar)
            })
            .collect();

        Arc::new(move |progress: WorkflowProgress| {
            let Some(bar) = bars.get(&progress.target_language) else {
                return;
            };
            bar.set_length(progress.total_batches as u64);
            bar.set_position(progress.completed_batches as u64);
            bar.set_message(format!("{} {}", progress.phase, progress.message));
            if progress.phase.is_terminal() {
                bar.finish();
            }
        })
    }

    // @formats: Duration as h/m/s
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{:.1}s", duration.as_secs_f64())
        }
    }
}

/// Output path of a language, for callers that want to predict it
pub fn output_path_for(input_file: &Path, output_dir: &Path, language: &str) -> Result<PathBuf> {
    let language = language_utils::resolve_language(language)?;
    Ok(FileManager::generate_output_path(input_file, output_dir, &language.code))
}
