/*!
 * Common test utilities for the sitewai test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use sitewai::translation::{ContentItem, Section, SectionTree};
use sitewai::WorkflowConfig;

// Scripted translation capability
pub mod mock_capability;

/// Routes library logs to the test output; `RUST_LOG` picks the level
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Content file in the `sections` shape
pub fn sample_sections_json() -> &'static str {
    r#"{
  "sections": [
    {
      "section_id": "hero",
      "title": "Hero",
      "display_title": "Welcome",
      "content": [
        {"type": "header", "value": "Welcome to Acme"},
        {"type": "content", "value": "We build tools for teams."},
        {"type": "button", "value": "Start"}
      ]
    },
    {
      "section_id": "features",
      "title": "Features",
      "content": [
        {"type": "header", "value": "Features"},
        {"type": "paired_box", "value": "Fast | Built for speed"}
      ]
    },
    {
      "section_id": "footer",
      "title": "Footer",
      "content": [
        {"type": "content", "value": "All rights reserved."}
      ]
    }
  ]
}"#
}

/// Content file in the grouped `pages` shape
pub fn sample_pages_json() -> &'static str {
    r#"{
  "website_metadata": {"language": "English", "site": "acme"},
  "pages": {
    "name": "Home",
    "group_1": {
      "meta_data": "Hero",
      "item_1": {"type": "header", "value": "Welcome"},
      "item_2": {"type": "content", "value": "Hello there"}
    },
    "group_2": {
      "meta_data": "Contact",
      "item_1": {"type": "button", "value": "Write us"}
    }
  }
}"#
}

/// Writes a sample content file and returns its path
pub fn create_test_content(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, sample_sections_json())
}

/// Section with one `content` item per value
pub fn section(id: &str, values: &[&str]) -> Section {
    Section::new(
        id,
        id,
        values.iter().map(|v| ContentItem::new("content", v)).collect(),
    )
}

/// Tree of `count` sections named `s0`, `s1`, ... with two items each
pub fn build_tree(count: usize) -> SectionTree {
    let sections = (0..count)
        .map(|i| {
            Section::new(
                &format!("s{}", i),
                &format!("Section {}", i),
                vec![
                    ContentItem::new("header", &format!("Title {}", i)),
                    ContentItem::new("content", &format!("Body text {}", i)),
                ],
            )
        })
        .collect();
    SectionTree::new(sections)
}

/// Workflow settings for tests: no stage delay, short timeouts
pub fn test_workflow(batch_concurrency: usize) -> WorkflowConfig {
    WorkflowConfig::default()
        .with_batch_concurrency(batch_concurrency)
        .with_stage_delay_ms(0)
        .with_per_batch_timeout_ms(2_000)
        .with_per_run_timeout_ms(20_000)
}
