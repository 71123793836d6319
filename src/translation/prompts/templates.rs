/*!
 * Prompt templates for website content translation.
 *
 * Every request to a model is a JSON document with a `task` field, and every
 * expected answer is a JSON object. Three tasks exist:
 * - `translate_sections`: translate the sections of one batch
 * - `review_translation`: judge a translated batch against its source
 * - `refine_document`: harmonize a whole translated document
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::translation::document::{Section, SectionTree};
use crate::validation::LengthValidator;

/// Task identifier of batch translation requests
pub const TASK_TRANSLATE: &str = "translate_sections";

/// Task identifier of review requests
pub const TASK_REVIEW: &str = "review_translation";

/// Task identifier of refinement requests
pub const TASK_REFINE: &str = "refine_document";

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap());

/// System prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// System prompt for batch translation.
    pub const WEBSITE_TRANSLATOR: &'static str = r#"You are a professional website translator and localizer translating into {target_language}.

## Your Role
- Translate every content item naturally, preserving meaning and tone
- Keep headers and buttons short; respect each item's max_chars limit
- Keep brand names, product names and URLs unchanged
- Convert dates to DD/MM/YYYY and imperial units to metric where the audience expects it

## Feedback
- If the request contains feedback from earlier attempts, address every point

## Output Requirements
- Return ONLY valid JSON: {"sections": [{"section_id": "...", "items": ["...", "..."]}]}
- Keep every section_id and the exact number and order of items
- Do not include any text outside the JSON structure"#;

    /// System prompt for translation review.
    pub const TRANSLATION_REVIEWER: &'static str = r#"You are a multilingual translation quality reviewer for {target_language} website content.

## Evaluate
1. Accuracy - Does each item keep the meaning of the original?
2. Grammar - Is it grammatically correct {target_language}?
3. Fluency - Does it sound natural on a website?
4. Length - Are headers and buttons still short enough for the layout?

## Output Requirements
- Return ONLY valid JSON: {"passed": true|false, "feedback": "..."}
- When not passed, give specific, concise corrections in feedback"#;

    /// System prompt for whole-document refinement.
    pub const DOCUMENT_REFINER: &'static str = r#"You are the final editor of a website translated into {target_language}.

## Your Role
- Harmonize terminology so the same source term is translated the same way everywhere
- Harmonize tone and register across all sections
- Change wording only where needed for consistency

## Output Requirements
- Return ONLY valid JSON: {"sections": [{"section_id": "...", "items": ["...", "..."]}]}
- Return every section exactly once with the same section_id and the same number of items
- Do not include any text outside the JSON structure"#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the batch translator template.
    pub fn website_translator() -> Self {
        Self::new(Self::WEBSITE_TRANSLATOR)
    }

    /// Create the reviewer template.
    pub fn translation_reviewer() -> Self {
        Self::new(Self::TRANSLATION_REVIEWER)
    }

    /// Create the refiner template.
    pub fn document_refiner() -> Self {
        Self::new(Self::DOCUMENT_REFINER)
    }

    /// Render the template for a target language.
    pub fn render(&self, target_language: &str) -> String {
        self.template.replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::website_translator()
    }
}

/// Builder for batch translation prompts.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    target_language: String,
    sections: Vec<PromptSection>,
    attempt: u32,
    feedback: Vec<String>,
    custom_instructions: Option<String>,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder.
    pub fn new(target_language: &str) -> Self {
        Self {
            target_language: target_language.to_string(),
            sections: Vec::new(),
            attempt: 0,
            feedback: Vec::new(),
            custom_instructions: None,
        }
    }

    /// Set the sections to translate.
    pub fn with_sections(mut self, sections: &[Section]) -> Self {
        let validator = LengthValidator::new();
        self.sections = sections
            .iter()
            .map(|section| PromptSection::from_section(section, Some(&validator)))
            .collect();
        self
    }

    /// Set the attempt number and the feedback of earlier attempts.
    pub fn with_feedback(mut self, attempt: u32, feedback: &[String]) -> Self {
        self.attempt = attempt;
        self.feedback = feedback.to_vec();
        self
    }

    /// Set custom instructions.
    pub fn with_custom_instructions(mut self, instructions: &str) -> Self {
        if !instructions.trim().is_empty() {
            self.custom_instructions = Some(instructions.to_string());
        }
        self
    }

    /// Build the system prompt.
    pub fn build_system_prompt(&self) -> String {
        PromptTemplate::website_translator().render(&self.target_language)
    }

    /// Build the user prompt as a JSON request.
    pub fn build_user_prompt(&self) -> String {
        let request = TranslationRequest {
            task: TASK_TRANSLATE.to_string(),
            target_language: self.target_language.clone(),
            attempt: self.attempt,
            feedback: self.feedback.clone(),
            sections: self.sections.clone(),
            instructions: self.custom_instructions.clone(),
        };

        serde_json::to_string_pretty(&request).unwrap_or_else(|_| "{}".to_string())
    }

    /// Build both system and user prompts.
    pub fn build(&self) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt())
    }
}

/// Build the system and user prompts of a review request.
pub fn build_review_prompt(
    target_language: &str,
    original: &[Section],
    translated: &[Section],
) -> (String, String) {
    let sections = original
        .iter()
        .zip(translated)
        .map(|(src, out)| ReviewSection {
            section_id: src.section_id.clone(),
            title: src.context_title().to_string(),
            items: src
                .items
                .iter()
                .zip(&out.items)
                .map(|(a, b)| ReviewItem {
                    item_type: a.item_type.clone(),
                    original: a.value.clone(),
                    translated: b.value.clone(),
                })
                .collect(),
        })
        .collect();

    let request = ReviewRequest {
        task: TASK_REVIEW.to_string(),
        target_language: target_language.to_string(),
        sections,
    };

    (
        PromptTemplate::translation_reviewer().render(target_language),
        serde_json::to_string_pretty(&request).unwrap_or_else(|_| "{}".to_string()),
    )
}

/// Build the system and user prompts of a refinement request.
pub fn build_refinement_prompt(target_language: &str, document: &SectionTree) -> (String, String) {
    let request = RefinementRequest {
        task: TASK_REFINE.to_string(),
        target_language: target_language.to_string(),
        sections: document
            .sections
            .iter()
            .map(|section| PromptSection::from_section(section, None))
            .collect(),
    };

    (
        PromptTemplate::document_refiner().render(target_language),
        serde_json::to_string_pretty(&request).unwrap_or_else(|_| "{}".to_string()),
    )
}

/// Extract the JSON object from a model reply.
///
/// Accepts a bare object, an object inside a code fence, or an object
/// surrounded by prose.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    if let Some(captures) = FENCED_JSON.captures(trimmed) {
        return captures.get(1).map(|m| m.as_str());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Batch translation request structure for JSON communication with LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Task identifier
    pub task: String,

    /// Target language
    pub target_language: String,

    /// 0 for a first translation, n for the n-th regeneration
    pub attempt: u32,

    /// Feedback from earlier attempts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feedback: Vec<String>,

    /// Sections to translate
    pub sections: Vec<PromptSection>,

    /// Custom instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A section as presented to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSection {
    /// Section identifier (must be returned unchanged)
    pub section_id: String,

    /// Section title, for context
    pub title: String,

    /// Items in order
    pub items: Vec<PromptItem>,
}

impl PromptSection {
    fn from_section(section: &Section, limits: Option<&LengthValidator>) -> Self {
        Self {
            section_id: section.section_id.clone(),
            title: section.context_title().to_string(),
            items: section
                .items
                .iter()
                .map(|item| PromptItem {
                    item_type: item.category().label().to_string(),
                    text: item.value.clone(),
                    max_chars: limits.map(|v| {
                        v.character_limit(item.category(), item.value.trim().chars().count())
                    }),
                })
                .collect(),
        }
    }
}

/// An item as presented to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptItem {
    /// Item category label
    #[serde(rename = "type")]
    pub item_type: String,

    /// Text
    pub text: String,

    /// Character limit for the translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
}

/// Review request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Task identifier
    pub task: String,

    /// Target language
    pub target_language: String,

    /// Sections with original and translated items side by side
    pub sections: Vec<ReviewSection>,
}

/// A section under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSection {
    /// Section identifier
    pub section_id: String,

    /// Section title
    pub title: String,

    /// Item pairs
    pub items: Vec<ReviewItem>,
}

/// One original/translated pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,

    /// Source text
    pub original: String,

    /// Translated text
    pub translated: String,
}

/// Refinement request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementRequest {
    /// Task identifier
    pub task: String,

    /// Target language
    pub target_language: String,

    /// Translated sections of the whole document
    pub sections: Vec<PromptSection>,
}

/// Expected answer to translation and refinement requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionsResponse {
    /// Translated sections
    pub sections: Vec<TranslatedSection>,
}

/// A translated section in a model answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedSection {
    /// Section identifier
    pub section_id: String,

    /// Translated item texts in order
    pub items: Vec<TranslatedItem>,
}

/// A translated item: either a bare string or an object with a text field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslatedItem {
    /// `"text"`
    Text(String),
    /// `{"text": "..."}` or `{"value": "..."}`
    Object {
        #[serde(alias = "value", alias = "translated")]
        text: String,
    },
}

impl TranslatedItem {
    /// The translated text
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Object { text } => text,
        }
    }
}

/// Expected answer to review requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    /// Whether the translation is acceptable
    pub passed: bool,

    /// Corrections when not passed
    #[serde(default)]
    pub feedback: Option<String>,
}
