/*!
 * Character limit validation for translated website content.
 *
 * Website layouts break when labels grow, so every translated item gets a
 * limit derived from its source length and item category:
 * - Headers and buttons: source length + 5 characters
 * - Everything else: source length + 20 characters
 */

use log::debug;

use crate::translation::document::{ItemCategory, Section};

/// Extra characters allowed for headers and buttons
const DEFAULT_SHORT_ITEM_ALLOWANCE: usize = 5;

/// Extra characters allowed for running text
const DEFAULT_LONG_ITEM_ALLOWANCE: usize = 20;

/// Result of length validation for a single item
#[derive(Debug, Clone)]
pub struct LengthItemResult {
    /// Section the item belongs to
    pub section_id: String,
    /// Position of the item in its section
    pub item_index: usize,
    /// Whether validation passed
    pub passed: bool,
    /// Issues found
    pub issues: Vec<LengthIssue>,
}

/// Types of length issues
#[derive(Debug, Clone, PartialEq)]
pub enum LengthIssue {
    /// Translation is empty while the source is not
    EmptyTranslation,
    /// Translation exceeds its character limit
    ExceedsLimit {
        item_type: String,
        source_len: usize,
        translated_len: usize,
        limit: usize,
    },
    /// Section or item structure differs from the source
    StructureMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for LengthIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthIssue::EmptyTranslation => {
                write!(f, "Translation is empty")
            }
            LengthIssue::ExceedsLimit {
                item_type,
                source_len,
                translated_len,
                limit,
            } => {
                write!(
                    f,
                    "{} is {} chars, limit is {} (source {} chars, {} over)",
                    item_type,
                    translated_len,
                    limit,
                    source_len,
                    translated_len - limit
                )
            }
            LengthIssue::StructureMismatch { expected, actual } => {
                write!(f, "Item count mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

/// Result of validating one translated batch
#[derive(Debug, Clone)]
pub struct LengthValidationResult {
    /// Overall pass/fail status
    pub passed: bool,
    /// Results for each item that has issues
    pub item_results: Vec<LengthItemResult>,
    /// Total number of issues
    pub total_issues: usize,
}

impl LengthValidationResult {
    /// Get all failed items
    pub fn failed_items(&self) -> Vec<&LengthItemResult> {
        self.item_results.iter().filter(|r| !r.passed).collect()
    }

    /// Feedback text for a regeneration request
    pub fn feedback(&self) -> String {
        let mut lines = vec![format!(
            "{} character limit violations. Headers and buttons may be at most 5 characters longer than the source, other content at most 20. Shorten these while keeping the meaning:",
            self.total_issues
        )];
        for item in self.failed_items() {
            for issue in &item.issues {
                lines.push(format!(
                    "- {} item {}: {}",
                    item.section_id,
                    item.item_index + 1,
                    issue
                ));
            }
        }
        lines.join("\n")
    }
}

/// Configuration for length validation
#[derive(Debug, Clone)]
pub struct LengthValidatorConfig {
    /// Extra characters allowed for headers and buttons
    pub short_item_allowance: usize,
    /// Extra characters allowed for other items
    pub long_item_allowance: usize,
    /// Whether to fail on empty translations
    pub fail_on_empty: bool,
}

impl Default for LengthValidatorConfig {
    fn default() -> Self {
        Self {
            short_item_allowance: DEFAULT_SHORT_ITEM_ALLOWANCE,
            long_item_allowance: DEFAULT_LONG_ITEM_ALLOWANCE,
            fail_on_empty: true,
        }
    }
}

/// Character limit validator for translated sections
#[derive(Debug, Clone, Default)]
pub struct LengthValidator {
    config: LengthValidatorConfig,
}

impl LengthValidator {
    /// Create a new validator with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new validator with custom configuration
    pub fn with_config(config: LengthValidatorConfig) -> Self {
        Self { config }
    }

    /// Character limit for an item of the given category and source length
    pub fn character_limit(&self, category: ItemCategory, source_len: usize) -> usize {
        match category {
            ItemCategory::Header | ItemCategory::Button => {
                source_len + self.config.short_item_allowance
            }
            _ => source_len + self.config.long_item_allowance,
        }
    }

    /// Validate a single item
    pub fn validate_item(
        &self,
        section_id: &str,
        item_index: usize,
        item_type: &str,
        source_text: &str,
        translated_text: &str,
    ) -> LengthItemResult {
        let source_len = source_text.trim().chars().count();
        let translated_len = translated_text.trim().chars().count();
        let limit = self.character_limit(ItemCategory::classify(item_type), source_len);

        let mut issues = Vec::new();
        if source_len > 0 && translated_len == 0 && self.config.fail_on_empty {
            issues.push(LengthIssue::EmptyTranslation);
        }
        if translated_len > limit {
            issues.push(LengthIssue::ExceedsLimit {
                item_type: item_type.to_string(),
                source_len,
                translated_len,
                limit,
            });
        }

        LengthItemResult {
            section_id: section_id.to_string(),
            item_index,
            passed: issues.is_empty(),
            issues,
        }
    }

    /// Validate translated sections against their sources.
    ///
    /// Sections are matched by position; only items with issues are reported.
    pub fn validate_sections(
        &self,
        source: &[Section],
        translated: &[Section],
    ) -> LengthValidationResult {
        let mut item_results = Vec::new();

        if source.len() != translated.len() {
            item_results.push(LengthItemResult {
                section_id: String::new(),
                item_index: 0,
                passed: false,
                issues: vec![LengthIssue::StructureMismatch {
                    expected: source.len(),
                    actual: translated.len(),
                }],
            });
        }

        for (src, out) in source.iter().zip(translated) {
            if src.items.len() != out.items.len() {
                item_results.push(LengthItemResult {
                    section_id: src.section_id.clone(),
                    item_index: 0,
                    passed: false,
                    issues: vec![LengthIssue::StructureMismatch {
                        expected: src.items.len(),
                        actual: out.items.len(),
                    }],
                });
                continue;
            }

            for (index, (src_item, out_item)) in src.items.iter().zip(&out.items).enumerate() {
                let result = self.validate_item(
                    &src.section_id,
                    index,
                    &src_item.item_type,
                    &src_item.value,
                    &out_item.value,
                );
                if !result.passed {
                    item_results.push(result);
                }
            }
        }

        let total_issues: usize = item_results.iter().map(|r| r.issues.len()).sum();

        debug!(
            "Length validation: {} sections, {} issues",
            source.len(),
            total_issues
        );

        LengthValidationResult {
            passed: item_results.is_empty(),
            item_results,
            total_issues,
        }
    }
}
