/*!
 * Loading and saving website content files.
 *
 * Two JSON shapes are accepted:
 * - `{"sections": [{"section_id", "title", "display_title", "content": [{"type", "value"}]}]}`
 * - the grouped page shape:
 *   `{"website_metadata": {...}, "pages": {"name": ..., "group_1": {"meta_data": ..., "item_1": {"type", "value"}}}}`
 *
 * Translated output is written back in the shape the content was read from.
 */

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};

use super::model::{ContentItem, Section, SectionTree};

/// JSON shape a content file was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    /// `{"sections": [...]}`
    Sections,
    /// `{"website_metadata": ..., "pages": {...}}`
    Pages,
}

/// A parsed content file: the section tree plus what is needed to write it back
#[derive(Debug, Clone)]
pub struct WebsiteContent {
    /// Shape of the source file
    pub shape: ContentShape,

    /// `website_metadata` object of the grouped shape, if any
    pub metadata: Option<Value>,

    /// `pages.name` of the grouped shape, if any
    pub page_name: Option<String>,

    /// Content tree
    pub tree: SectionTree,
}

impl WebsiteContent {
    /// Parse content from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("Content file is not valid JSON")?;
        Self::from_value(value)
    }

    /// Parse content from an already decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(anyhow!("Content root must be a JSON object"));
        };

        if let Some(sections) = root.remove("sections") {
            let sections: Vec<Section> =
                serde_json::from_value(sections).context("Invalid 'sections' array")?;
            return Ok(Self {
                shape: ContentShape::Sections,
                metadata: None,
                page_name: None,
                tree: SectionTree::new(sections),
            });
        }

        let Some(Value::Object(pages)) = root.remove("pages") else {
            return Err(anyhow!(
                "Content must contain either a 'sections' array or a 'pages' object"
            ));
        };

        let page_name = pages.get("name").and_then(Value::as_str).map(str::to_string);
        let tree = parse_pages(&pages)?;

        Ok(Self {
            shape: ContentShape::Pages,
            metadata: root.remove("website_metadata"),
            page_name,
            tree,
        })
    }

    /// Render a (translated) tree back in the shape this content was read from.
    ///
    /// `language` replaces `website_metadata.language` in the grouped shape.
    pub fn render(&self, tree: &SectionTree, language: Option<&str>) -> Value {
        match self.shape {
            ContentShape::Sections => {
                let mut root = Map::new();
                root.insert(
                    "sections".to_string(),
                    serde_json::to_value(&tree.sections).unwrap_or(Value::Array(Vec::new())),
                );
                if let Some(lang) = language {
                    root.insert("target_language".to_string(), Value::String(lang.to_string()));
                }
                Value::Object(root)
            }
            ContentShape::Pages => {
                let mut root = Map::new();
                let mut metadata = self.metadata.clone().unwrap_or_else(|| Value::Object(Map::new()));
                if let (Some(lang), Value::Object(meta)) = (language, &mut metadata) {
                    meta.insert("language".to_string(), Value::String(lang.to_string()));
                }
                root.insert("website_metadata".to_string(), metadata);

                let mut pages = Map::new();
                if let Some(name) = &self.page_name {
                    pages.insert("name".to_string(), Value::String(name.clone()));
                }
                for section in &tree.sections {
                    let mut group = Map::new();
                    group.insert(
                        "meta_data".to_string(),
                        Value::String(section.context_title().to_string()),
                    );
                    for (idx, item) in section.items.iter().enumerate() {
                        let mut entry = Map::new();
                        entry.insert("type".to_string(), Value::String(item.item_type.clone()));
                        entry.insert("value".to_string(), Value::String(item.value.clone()));
                        group.insert(format!("item_{}", idx + 1), Value::Object(entry));
                    }
                    pages.insert(section.section_id.clone(), Value::Object(group));
                }
                root.insert("pages".to_string(), Value::Object(pages));
                Value::Object(root)
            }
        }
    }
}

/// Convert the grouped `pages` object into sections, ordered by group number
fn parse_pages(pages: &Map<String, Value>) -> Result<SectionTree> {
    let mut groups: Vec<(&String, &Map<String, Value>)> = pages
        .iter()
        .filter(|(key, _)| key.as_str() != "name")
        .filter_map(|(key, value)| value.as_object().map(|group| (key, group)))
        .collect();
    groups.sort_by(|a, b| natural_key(a.0).cmp(&natural_key(b.0)));

    let mut sections = Vec::with_capacity(groups.len());
    for (group_key, group) in groups {
        let title = group
            .get("meta_data")
            .and_then(Value::as_str)
            .unwrap_or(group_key)
            .to_string();

        let mut entries: Vec<(&String, &Map<String, Value>)> = group
            .iter()
            .filter(|(key, _)| key.as_str() != "meta_data")
            .filter_map(|(key, value)| value.as_object().map(|item| (key, item)))
            .filter(|(_, item)| item.contains_key("value"))
            .collect();
        entries.sort_by(|a, b| natural_key(a.0).cmp(&natural_key(b.0)));

        let items = entries
            .into_iter()
            .map(|(item_key, item)| {
                let item_type = item.get("type").and_then(Value::as_str).unwrap_or("content");
                let value = item
                    .get("value")
                    .and_then(Value::as_str)
                    .with_context(|| format!("{}.{}: 'value' must be a string", group_key, item_key))?;
                Ok(ContentItem::new(item_type, value))
            })
            .collect::<Result<Vec<_>>>()?;

        sections.push(Section::new(group_key, &title, items));
    }

    Ok(SectionTree::new(sections))
}

/// Sort key splitting a trailing number off a key, so `group_10` follows `group_9`
fn natural_key(key: &str) -> (&str, u64) {
    let digits_start = key
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx);

    match digits_start {
        Some(idx) => (&key[..idx], key[idx..].parse().unwrap_or(u64::MAX)),
        None => (key, 0),
    }
}
