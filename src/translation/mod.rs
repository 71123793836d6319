/*!
 * Website content translation.
 *
 * This module contains the translation workflow and everything it needs.
 * It is split into several submodules:
 *
 * - `document`: Section tree model and website JSON shapes
 * - `capability`: Contract for translate/review/refine operations
 * - `pipeline`: Staged parallel workflow over a capability
 * - `core`: Provider-backed capability implementation
 * - `prompts`: Prompt templates, request building and answer parsing
 * - `cache`: Batch translation cache
 * - `concurrency`: Provider-tuned stage sizes and delays
 */

// Re-export main types for easier usage
pub use self::capability::{ReviewAssessment, ReviewContext, TranslationCapability, TranslationContext};
pub use self::core::{TokenUsageStats, TranslationService};

// Re-export document model types
pub use self::document::{ContentItem, ContentShape, ItemCategory, Section, SectionTree, WebsiteContent};

// Re-export workflow types
pub use self::pipeline::{FinalResult, RunSummary, WorkflowConfig, WorkflowOrchestrator};

// Submodules
pub mod cache;
pub mod capability;
pub mod concurrency;
pub mod core;
pub mod document;
pub mod pipeline;
pub mod prompts;
