/*!
 * Batch planning: splitting a content tree into batches and stages.
 *
 * A plan is a pure function of the tree and the sizing parameters. Every
 * section lands in exactly one batch, batches keep document order, and
 * stages hold at most `batch_concurrency` batches each.
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::errors::PlanError;
use crate::translation::document::{Section, SectionTree};

/// Unique, deterministic identifier of a batch within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchKey(String);

impl BatchKey {
    /// Derive the key for a batch from the identifiers of its first and last sections
    pub fn for_sections(first: &str, last: &str) -> Self {
        if first == last {
            Self(format!("batch_{}", first))
        } else {
            Self(format!("batch_{}__{}", first, last))
        }
    }

    /// Same key with a positional suffix, used when the plain key is already taken
    fn with_suffix(&self, suffix: usize) -> Self {
        Self(format!("{}~{}", self.0, suffix))
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BatchKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// One unit of translation work
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Unique key
    pub key: BatchKey,

    /// Position of the batch in the whole plan
    pub index: usize,

    /// Source sections, in document order
    pub sections: Vec<Section>,
}

impl Batch {
    /// Identifiers of the sections in this batch
    pub fn section_ids(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.section_id.clone()).collect()
    }

    /// Total number of content items in this batch
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    /// Count of content items per item type, sorted by type name
    pub fn item_type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in self.sections.iter().flat_map(|s| s.items.iter()) {
            *counts.entry(item.item_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Short human readable description, e.g. `batch_hero (2 items: 1 button, 1 header)`
    pub fn description(&self) -> String {
        let types = self
            .item_type_counts()
            .iter()
            .map(|(t, n)| format!("{} {}", n, t))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} ({} items: {})", self.key, self.item_count(), types)
    }
}

/// Batches that run concurrently
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Position of the stage in the plan
    pub index: usize,

    /// Batches of the stage
    pub batches: Vec<Batch>,
}

impl Stage {
    /// Number of batches in the stage
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether the stage has no batches
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Ordered stages covering a whole content tree
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Stages in execution order
    pub stages: Vec<Stage>,
}

impl Plan {
    /// All batches in plan order
    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.stages.iter().flat_map(|stage| stage.batches.iter())
    }

    /// Number of batches in the plan
    pub fn batch_count(&self) -> usize {
        self.stages.iter().map(Stage::len).sum()
    }

    /// Look up a batch by key
    pub fn batch(&self, key: &BatchKey) -> Option<&Batch> {
        self.batches().find(|b| &b.key == key)
    }

    /// Batch keys in plan order
    pub fn keys(&self) -> Vec<BatchKey> {
        self.batches().map(|b| b.key.clone()).collect()
    }
}

/// Splits a content tree into batches and stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlanner {
    /// Maximum number of batches per stage
    pub batch_concurrency: usize,

    /// Number of consecutive sections grouped into one batch
    pub sections_per_batch: usize,
}

impl BatchPlanner {
    /// Planner with one section per batch
    pub fn new(batch_concurrency: usize) -> Self {
        Self {
            batch_concurrency,
            sections_per_batch: 1,
        }
    }

    /// Set how many sections go into each batch
    pub fn with_sections_per_batch(mut self, sections_per_batch: usize) -> Self {
        self.sections_per_batch = sections_per_batch;
        self
    }

    /// Build the plan for a tree.
    pub fn plan(&self, tree: &SectionTree) -> Result<Plan, PlanError> {
        if self.batch_concurrency == 0 {
            return Err(PlanError::InvalidParameter {
                name: "batch_concurrency",
            });
        }
        if self.sections_per_batch == 0 {
            return Err(PlanError::InvalidParameter {
                name: "sections_per_batch",
            });
        }
        if tree.is_empty() {
            return Err(PlanError::EmptyTree);
        }

        let mut seen = HashSet::with_capacity(tree.len());
        for (position, section) in tree.sections.iter().enumerate() {
            if section.section_id.trim().is_empty() {
                return Err(PlanError::EmptySectionId(position));
            }
            if !seen.insert(section.section_id.as_str()) {
                return Err(PlanError::DuplicateSection(section.section_id.clone()));
            }
        }

        // Grouped keys can collide when ids contain the separator, e.g. `a`,`b` and `a__b`
        let mut used: HashSet<BatchKey> = HashSet::new();
        let mut batches: Vec<Batch> = Vec::new();
        for (index, chunk) in tree.sections.chunks(self.sections_per_batch).enumerate() {
            let (Some(first), Some(last)) = (chunk.first(), chunk.last()) else {
                continue;
            };
            let base = BatchKey::for_sections(&first.section_id, &last.section_id);
            let mut key = base.clone();
            let mut suffix = index;
            while used.contains(&key) {
                key = base.with_suffix(suffix);
                suffix += 1;
            }
            used.insert(key.clone());
            batches.push(Batch {
                key,
                index,
                sections: chunk.to_vec(),
            });
        }

        let stages = batches
            .chunks(self.batch_concurrency)
            .enumerate()
            .map(|(index, chunk)| Stage {
                index,
                batches: chunk.to_vec(),
            })
            .collect();

        Ok(Plan { stages })
    }
}
