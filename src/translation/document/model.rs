/*!
 * Core document model types for website content translation.
 *
 * These types provide a JSON-serializable representation of a website's
 * content tree: ordered sections, each holding ordered typed content items.
 * Source sections are never mutated by the pipeline; translated copies are
 * produced with `Section::with_values`.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete content tree of a website (or of one page).
///
/// This is the primary data structure for the translation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SectionTree {
    /// Sections in display order
    pub sections: Vec<Section>,
}

impl SectionTree {
    /// Create a tree from a list of sections.
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Number of sections in the tree.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the tree has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total number of content items across all sections.
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    /// Section identifiers in document order.
    pub fn section_ids(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.section_id.as_str()).collect()
    }

    /// Set of section identifiers, used for completeness checks.
    pub fn section_id_set(&self) -> HashSet<&str> {
        self.sections.iter().map(|s| s.section_id.as_str()).collect()
    }

    /// Look up a section by identifier.
    pub fn get(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.section_id == section_id)
    }

    /// Whether both trees hold exactly the same section identifiers, in any order.
    pub fn has_same_sections(&self, other: &SectionTree) -> bool {
        self.sections.len() == other.sections.len()
            && self.section_id_set() == other.section_id_set()
    }
}

/// One section of a page: a stable identifier and its ordered content items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier, unique within a tree
    pub section_id: String,

    /// Internal title
    #[serde(default)]
    pub title: String,

    /// Title shown to users, if different from `title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,

    /// Ordered content items
    #[serde(rename = "content", default)]
    pub items: Vec<ContentItem>,
}

impl Section {
    /// Create a new section.
    pub fn new(section_id: &str, title: &str, items: Vec<ContentItem>) -> Self {
        Self {
            section_id: section_id.to_string(),
            title: title.to_string(),
            display_title: None,
            items,
        }
    }

    /// Set the display title.
    pub fn with_display_title(mut self, display_title: &str) -> Self {
        self.display_title = Some(display_title.to_string());
        self
    }

    /// Title used as context when translating this section.
    pub fn context_title(&self) -> &str {
        self.display_title.as_deref().unwrap_or(&self.title)
    }

    /// Produce a copy of this section carrying the given values.
    ///
    /// Item types are always taken from `self`, so a translated copy can never
    /// change the structure of the source. Returns `None` when the number of
    /// values does not match the number of items.
    pub fn with_values<I, S>(&self, values: I) -> Option<Section>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != self.items.len() {
            return None;
        }

        let items = self
            .items
            .iter()
            .zip(values)
            .map(|(item, value)| ContentItem {
                item_type: item.item_type.clone(),
                value,
            })
            .collect();

        Some(Section {
            section_id: self.section_id.clone(),
            title: self.title.clone(),
            display_title: self.display_title.clone(),
            items,
        })
    }

    /// Total characters of all item values.
    pub fn char_count(&self) -> usize {
        self.items.iter().map(|i| i.value.chars().count()).sum()
    }
}

/// A single typed piece of content (header, paragraph, button label, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Item type as written in the source content, preserved verbatim
    #[serde(rename = "type")]
    pub item_type: String,

    /// Text value
    pub value: String,
}

impl ContentItem {
    /// Create a new content item.
    pub fn new(item_type: &str, value: &str) -> Self {
        Self {
            item_type: item_type.to_string(),
            value: value.to_string(),
        }
    }

    /// Coarse category of this item's type.
    pub fn category(&self) -> ItemCategory {
        ItemCategory::classify(&self.item_type)
    }
}

/// Coarse classification of content item types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    /// Headings and titles
    Header,
    /// Running text
    Content,
    /// Button and link labels
    Button,
    /// Paired boxes (e.g. feature/benefit cards)
    PairedBox,
    /// Anything else
    Other,
}

impl ItemCategory {
    /// Classify a raw item type string.
    pub fn classify(item_type: &str) -> Self {
        let normalized = item_type.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "header" | "heading" | "title" | "subheader" | "subtitle" => Self::Header,
            "content" | "paragraph" | "text" | "body" | "description" => Self::Content,
            "button" | "button_label" | "cta" | "link" => Self::Button,
            "paired_box" | "pairedbox" | "box" | "card" => Self::PairedBox,
            _ => Self::Other,
        }
    }

    /// Short label used in prompts and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Header => "HEADER",
            Self::Content => "CONTENT",
            Self::Button => "BUTTON",
            Self::PairedBox => "PAIRED_BOX",
            Self::Other => "OTHER",
        }
    }
}
