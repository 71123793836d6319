/*!
 * Language utilities for target language handling.
 *
 * Target languages may be given as ISO 639-1 codes, ISO 639-2/T or /B
 * codes, or English language names. They are resolved to a code used for
 * output file names and a name used in prompts.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// A resolved target language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLanguage {
    /// ISO 639-1 code, or ISO 639-3 when no 2-letter code exists
    pub code: String,
    /// English name
    pub name: String,
    /// Name in the language itself, when known
    pub native_name: Option<String>,
}

impl TargetLanguage {
    /// Name with the native name in parentheses when it differs
    pub fn display_name(&self) -> String {
        match &self.native_name {
            Some(native) if native != &self.name => format!("{} ({})", self.name, native),
            _ => self.name.clone(),
        }
    }
}

fn lookup(input: &str) -> Option<Language> {
    let normalized = input.trim().to_lowercase();
    match normalized.len() {
        0 | 1 => None,
        2 => Language::from_639_1(&normalized),
        3 => {
            let part2t = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(b, _)| *b == normalized)
                .map(|(_, t)| *t)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(part2t)
        }
        _ => Language::from_name_lowercase(&normalized),
    }
}

/// Resolve a code or English name to a target language
pub fn resolve_language(input: &str) -> Result<TargetLanguage> {
    let lang = lookup(input).ok_or_else(|| anyhow!("Unknown language: {}", input))?;
    Ok(TargetLanguage {
        code: lang.to_639_1().unwrap_or_else(|| lang.to_639_3()).to_string(),
        name: lang.to_name().to_string(),
        native_name: lang.to_autonym().map(str::to_string),
    })
}

/// Validate if a string names a known language
pub fn validate_language(input: &str) -> Result<()> {
    resolve_language(input).map(|_| ())
}

/// Get the English language name from a code or name
pub fn get_language_name(input: &str) -> Result<String> {
    resolve_language(input).map(|lang| lang.name)
}

/// Normalize a code or name to ISO 639-1, falling back to ISO 639-3
pub fn normalize_code(input: &str) -> Result<String> {
    resolve_language(input).map(|lang| lang.code)
}

/// Check if two inputs denote the same language
pub fn language_codes_match(first: &str, second: &str) -> bool {
    match (lookup(first), lookup(second)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
