// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use sitewai::app_config::{Config, LogLevel, TranslationProvider};
use sitewai::app_controller::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
    Mock,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
            CliTranslationProvider::Mock => TranslationProvider::Mock,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a website content file into one or more languages
    Translate(TranslateArgs),

    /// Generate shell completions for sitewai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Website content JSON file
    #[arg(value_name = "CONTENT_FILE")]
    input_file: PathBuf,

    /// Target languages, as codes or English names (repeatable)
    #[arg(short, long = "target", value_name = "LANG", num_args = 1..)]
    target_languages: Vec<String>,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Batches translated concurrently per stage
    #[arg(short = 'k', long)]
    batch_concurrency: Option<usize>,

    /// Maximum regeneration attempts per batch
    #[arg(short = 'r', long)]
    max_regenerations: Option<u32>,

    /// Skip the whole-document refinement pass
    #[arg(long)]
    no_refine: bool,

    /// Reject translations that exceed per-item character limits
    #[arg(long)]
    length_limits: bool,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force: bool,
}

/// SITEwAI - Staged parallel website translation with AI
#[derive(Parser, Debug)]
#[command(name = "sitewai")]
#[command(version)]
#[command(about = "AI-powered website content translation")]
#[command(long_about = "sitewai translates website content JSON into other languages in staged, parallel batches,
reviews every batch, regenerates rejected ones with feedback and harmonizes the result.

EXAMPLES:
    sitewai translate site.json -t fr                   # Translate using default config
    sitewai translate site.json -t fr de es -o out/     # Several languages at once
    sitewai translate site.json -t German -p openai     # Use a specific provider
    sitewai translate site.json -t fr -k 5 -r 3         # Wider stages, more regenerations
    sitewai translate site.json -t fr -p mock           # Dry run without a model
    sitewai completions bash > sitewai.bash             # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)
    mock      - Offline echo provider for dry runs")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the configured level is applied once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "sitewai", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

/// Apply command line overrides to a loaded configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if !options.target_languages.is_empty() {
        config.target_languages = options.target_languages.clone();
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    let touches_workflow = options.batch_concurrency.is_some()
        || options.max_regenerations.is_some()
        || options.no_refine
        || options.length_limits;
    if touches_workflow {
        let mut workflow = config.workflow_config_with_stage_size(options.batch_concurrency);
        if let Some(r) = options.max_regenerations {
            workflow = workflow.with_max_regeneration_attempts(r);
        }
        if options.no_refine {
            workflow = workflow.with_refinement(false);
        }
        if options.length_limits {
            workflow = workflow.with_length_limits(true);
        }
        config.workflow = Some(workflow);
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let mut config = Config::load_or_create(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    let output_dir = options.output_dir.clone().unwrap_or_else(|| {
        options
            .input_file
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf()
    });

    let controller = Controller::with_config(config)?;

    let cancel = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with what has been translated so far");
            cancel.cancel();
        }
    });

    let outcomes = controller
        .run(options.input_file.clone(), output_dir, options.force)
        .await
        .context("Translation failed")?;

    let written = outcomes.iter().filter(|o| o.is_written()).count();
    for outcome in outcomes.iter().filter(|o| !o.is_written()) {
        error!(
            "{}: {}",
            outcome.language.display_name(),
            outcome.error.as_deref().unwrap_or("not translated")
        );
    }
    info!("{}/{} languages written", written, outcomes.len());

    Ok(())
}
