/*!
 * Prompt engineering for website content translation.
 *
 * This module provides:
 * - System prompt templates for translation, review and refinement
 * - JSON request construction from sections and feedback
 * - Tolerant parsing of JSON answers
 */

pub mod templates;

// Re-export main types
pub use templates::{
    PromptTemplate, ReviewResponse, SectionsResponse, TranslationPromptBuilder,
    build_refinement_prompt, build_review_prompt, extract_json,
};
