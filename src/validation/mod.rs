/*!
 * Validation module for translation quality assurance.
 *
 * - `length`: Character limits per content item type
 */

pub mod length;

// Re-export main types
pub use length::{LengthIssue, LengthValidationResult, LengthValidator, LengthValidatorConfig};
