/*!
 * # SITEwAI - Staged parallel website translation with AI
 *
 * A Rust library for translating structured website content with LLMs.
 *
 * ## Features
 *
 * - Website content trees in two JSON shapes (section list and page map)
 * - Batches translated concurrently in bounded stages behind a barrier
 * - Per-batch review, bounded regeneration with cumulative feedback
 * - Whole-document refinement with an integrity check and fallback
 * - Failures contained per batch; degraded batches are reported, not fatal
 * - Providers:
 *   - Ollama (local LLM)
 *   - OpenAI API and LM Studio
 *   - Anthropic API
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: Translation workflow and services:
 *   - `translation::document`: Section tree and website JSON shapes
 *   - `translation::capability`: Translate/review/refine contract
 *   - `translation::pipeline`: Planner, scheduler, review, regeneration, refinement
 *   - `translation::core`: Provider-backed capability
 *   - `translation::prompts`: Prompt templates and answer parsing
 *   - `translation::cache`: Batch translation cache
 * - `validation`: Per-item character limits
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: Language code and name resolution
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, CapabilityError, ProviderError, WorkflowError};
pub use language_utils::{get_language_name, language_codes_match, resolve_language};
pub use translation::{
    FinalResult, RunSummary, SectionTree, TranslationCapability, TranslationService, WorkflowConfig,
    WorkflowOrchestrator,
};
