/*!
 * Translation caching functionality.
 *
 * Batch translations are cached under a SHA-256 fingerprint of the request:
 * the source sections, the target language and the feedback carried by the
 * request. A regeneration with new feedback therefore never hits the entry
 * of the attempt it is correcting.
 */

use log::debug;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::translation::document::Section;

/// Fingerprint of one batch request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Fingerprint sections, target language and feedback
    pub fn new(sections: &[Section], target_language: &str, feedback: &[String]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(target_language.trim().to_lowercase().as_bytes());
        for section in sections {
            hasher.update([0x1e]);
            hasher.update(section.section_id.as_bytes());
            for item in &section.items {
                hasher.update([0x1f]);
                hasher.update(item.item_type.as_bytes());
                hasher.update([0x1f]);
                hasher.update(item.value.as_bytes());
            }
        }
        for note in feedback {
            hasher.update([0x1d]);
            hasher.update(note.as_bytes());
        }

        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Translation cache for storing and retrieving batch translations
#[derive(Clone)]
pub struct TranslationCache {
    /// Internal cache storage
    cache: Arc<RwLock<HashMap<CacheKey, Vec<Section>>>>,

    /// Cache hit counter
    hits: Arc<AtomicUsize>,

    /// Cache miss counter
    misses: Arc<AtomicUsize>,

    /// Whether caching is enabled
    enabled: bool,
}

impl TranslationCache {
    /// Create a new translation cache
    pub fn new(enabled: bool) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            enabled,
        }
    }

    /// Get a batch translation from the cache
    pub fn get(&self, key: &CacheKey) -> Option<Vec<Section>> {
        if !self.enabled {
            return None;
        }

        match self.cache.read().get(key) {
            Some(sections) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", &key.as_str()[..12]);
                Some(sections.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a batch translation in the cache
    pub fn store(&self, key: CacheKey, sections: &[Section]) {
        if !self.enabled {
            return;
        }
        self.cache.write().insert(key, sections.to_vec());
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };

        (hits, misses, hit_rate)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.cache.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Check if the cache is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}
