/*!
 * Tests for language utility functions
 */

use anyhow::Result;
use sitewai::language_utils::{
    get_language_name, language_codes_match, normalize_code, resolve_language, validate_language,
};

/// Test resolution of the accepted input forms
#[test]
fn test_resolveLanguage_withCodesAndNames_shouldResolveSameLanguage() -> Result<()> {
    for input in ["de", "deu", "ger", "German", " GERMAN ", "DE"] {
        let language = resolve_language(input)?;
        assert_eq!(language.code, "de", "input {:?}", input);
        assert_eq!(language.name, "German", "input {:?}", input);
    }
    Ok(())
}

/// Test that languages without a two-letter code keep their three-letter code
#[test]
fn test_normalizeCode_withoutPart1Code_shouldFallBackToPart3() -> Result<()> {
    assert_eq!(normalize_code("fr")?, "fr");
    assert_eq!(normalize_code("fre")?, "fr");
    assert_eq!(normalize_code("haw")?, "haw");
    Ok(())
}

/// Test validation of unknown inputs
#[test]
fn test_validateLanguage_withInvalidInputs_shouldFail() {
    assert!(validate_language("xyz").is_err());
    assert!(validate_language("e").is_err());
    assert!(validate_language("").is_err());
    assert!(validate_language("Notalanguage").is_err());
    assert!(validate_language("es").is_ok());
}

/// Test English names
#[test]
fn test_getLanguageName_withCodes_shouldReturnEnglishName() -> Result<()> {
    assert_eq!(get_language_name("fr")?, "French");
    assert_eq!(get_language_name("jpn")?, "Japanese");
    assert_eq!(get_language_name("spanish")?, "Spanish");
    Ok(())
}

/// Test language comparison across code forms
#[test]
fn test_languageCodesMatch_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("fr", "fra"));
    assert!(language_codes_match("fre", "French"));
    assert!(language_codes_match("EN", "eng"));
    assert!(!language_codes_match("fr", "de"));
    assert!(!language_codes_match("fr", "xyz"));
}

/// Test display names with native names
#[test]
fn test_displayName_shouldIncludeNativeName() -> Result<()> {
    let german = resolve_language("de")?;
    assert_eq!(german.native_name.as_deref(), Some("Deutsch"));
    assert_eq!(german.display_name(), "German (Deutsch)");
    Ok(())
}
