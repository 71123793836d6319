/*!
 * Scripted translation capability for workflow tests.
 *
 * Behaviour is scripted per section identifier: the n-th entry of a
 * translate script applies to attempt n of the batch starting with that
 * section, the n-th entry of a review script to the n-th review call.
 * Unscripted calls translate by prefixing `[<language>] ` and pass review.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use sitewai::errors::{CapabilityError, ProviderError};
use sitewai::translation::{
    ReviewAssessment, ReviewContext, Section, SectionTree, TranslationCapability, TranslationContext,
};

/// What one translate attempt does
#[derive(Debug, Clone)]
pub enum TranslateStep {
    /// Translate normally
    Ok,
    /// Translate after sleeping
    Delay(u64),
    /// Return a provider error
    Fail(String),
    /// Panic inside the call
    Panic,
    /// Never return
    Hang,
    /// Return the wrong number of items
    Malformed,
}

/// What one review call answers
#[derive(Debug, Clone)]
pub enum ReviewStep {
    Pass,
    Regenerate(String),
    Fail,
}

/// What the refinement call does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineMode {
    /// Return every section with a `(refined)` suffix
    Suffix,
    /// Return the document unchanged
    Echo,
    /// Drop the first section
    DropSection,
    /// Add a section that was not in the input
    ExtraSection,
    /// Return an error
    Fail,
}

/// One recorded translate call
#[derive(Debug, Clone)]
pub struct TranslateCall {
    pub section_id: String,
    pub batch_key: String,
    pub attempt: u32,
    pub feedback: Vec<String>,
    pub started: Instant,
    pub finished: Option<Instant>,
}

#[derive(Debug)]
pub struct ScriptedCapability {
    translate_script: HashMap<String, Vec<TranslateStep>>,
    review_script: HashMap<String, Vec<ReviewStep>>,
    refine_mode: RefineMode,
    calls: Mutex<Vec<TranslateCall>>,
    review_calls: Mutex<HashMap<String, usize>>,
    refine_calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for ScriptedCapability {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCapability {
    pub fn new() -> Self {
        Self {
            translate_script: HashMap::new(),
            review_script: HashMap::new(),
            refine_mode: RefineMode::Suffix,
            calls: Mutex::new(Vec::new()),
            review_calls: Mutex::new(HashMap::new()),
            refine_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Script the translate attempts of the batch starting with `section_id`
    pub fn translate(mut self, section_id: &str, steps: Vec<TranslateStep>) -> Self {
        self.translate_script.insert(section_id.to_string(), steps);
        self
    }

    /// Script the review calls of the batch starting with `section_id`
    pub fn review(mut self, section_id: &str, steps: Vec<ReviewStep>) -> Self {
        self.review_script.insert(section_id.to_string(), steps);
        self
    }

    pub fn refine(mut self, mode: RefineMode) -> Self {
        self.refine_mode = mode;
        self
    }

    /// Every translate call so far, in start order
    pub fn calls(&self) -> Vec<TranslateCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Translate calls of the batch starting with `section_id`
    pub fn calls_for(&self, section_id: &str) -> Vec<TranslateCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.section_id == section_id)
            .collect()
    }

    pub fn translate_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn review_count(&self) -> usize {
        self.review_calls.lock().unwrap().values().sum()
    }

    pub fn refine_count(&self) -> usize {
        self.refine_calls.load(Ordering::SeqCst)
    }

    /// Highest number of translate calls in flight at once
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn record_start(&self, section_id: &str, context: &TranslationContext) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(TranslateCall {
            section_id: section_id.to_string(),
            batch_key: context.batch_key.clone(),
            attempt: context.attempt,
            feedback: context.feedback_history.clone(),
            started: Instant::now(),
            finished: None,
        });
        calls.len() - 1
    }

    fn record_finish(&self, index: usize) {
        if let Some(call) = self.calls.lock().unwrap().get_mut(index) {
            call.finished = Some(Instant::now());
        }
    }
}

/// Prefix every value of `sections`
pub fn translated(sections: &[Section], language: &str) -> Vec<Section> {
    sections
        .iter()
        .map(|section| {
            let mut out = section.clone();
            for item in &mut out.items {
                item.value = format!("[{}] {}", language, item.value);
            }
            out
        })
        .collect()
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TranslationCapability for ScriptedCapability {
    async fn translate_batch(
        &self,
        sections: &[Section],
        context: &TranslationContext,
    ) -> Result<Vec<Section>, CapabilityError> {
        let first = sections
            .first()
            .map(|s| s.section_id.clone())
            .unwrap_or_default();
        let index = self.record_start(&first, context);

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        let step = self
            .translate_script
            .get(&first)
            .and_then(|steps| steps.get(context.attempt as usize))
            .cloned()
            .unwrap_or(TranslateStep::Ok);

        let result = match step {
            TranslateStep::Ok => Ok(translated(sections, &context.target_language)),
            TranslateStep::Delay(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(translated(sections, &context.target_language))
            }
            TranslateStep::Fail(message) => Err(CapabilityError::Provider(ProviderError::RequestFailed(message))),
            TranslateStep::Panic => panic!("scripted panic in {}", first),
            TranslateStep::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
            TranslateStep::Malformed => {
                let mut out = translated(sections, &context.target_language);
                for section in &mut out {
                    section.items.pop();
                }
                Ok(out)
            }
        };

        self.record_finish(index);
        result
    }

    async fn review_batch(
        &self,
        original: &[Section],
        _translated: &[Section],
        _context: &ReviewContext,
    ) -> Result<ReviewAssessment, CapabilityError> {
        let first = original
            .first()
            .map(|s| s.section_id.clone())
            .unwrap_or_default();
        let call = {
            let mut counts = self.review_calls.lock().unwrap();
            let count = counts.entry(first.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };

        let step = self
            .review_script
            .get(&first)
            .and_then(|steps| steps.get(call))
            .cloned()
            .unwrap_or(ReviewStep::Pass);

        match step {
            ReviewStep::Pass => Ok(ReviewAssessment::pass()),
            ReviewStep::Regenerate(feedback) => Ok(ReviewAssessment::regenerate(feedback)),
            ReviewStep::Fail => Err(CapabilityError::Unavailable("reviewer offline".to_string())),
        }
    }

    async fn refine_document(
        &self,
        document: &SectionTree,
        _target_language: &str,
    ) -> Result<SectionTree, CapabilityError> {
        self.refine_calls.fetch_add(1, Ordering::SeqCst);

        match self.refine_mode {
            RefineMode::Echo => Ok(document.clone()),
            RefineMode::Suffix => {
                let mut refined = document.clone();
                for section in &mut refined.sections {
                    for item in &mut section.items {
                        item.value = format!("{} (refined)", item.value);
                    }
                }
                Ok(refined)
            }
            RefineMode::DropSection => {
                let mut refined = document.clone();
                if !refined.sections.is_empty() {
                    refined.sections.remove(0);
                }
                Ok(refined)
            }
            RefineMode::ExtraSection => {
                let mut refined = document.clone();
                refined
                    .sections
                    .push(Section::new("invented", "Invented", Vec::new()));
                Ok(refined)
            }
            RefineMode::Fail => Err(CapabilityError::MalformedOutput("refiner gave up".to_string())),
        }
    }
}
