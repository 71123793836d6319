/*!
 * Document modeling for website content translation.
 *
 * This module provides the content model the pipeline works on:
 * - Ordered sections with stable identifiers
 * - Typed content items whose types are never changed by translation
 * - Loading and saving of the supported content file shapes
 */

pub mod model;
pub mod website;

// Re-export types used by other modules
pub use model::{ContentItem, ItemCategory, Section, SectionTree};
pub use website::{ContentShape, WebsiteContent};
