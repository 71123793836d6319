/*!
 * Tests for prompt building and model answer parsing
 */

use sitewai::translation::prompts::templates::{
    RefinementRequest, ReviewRequest, SectionsResponse, TASK_REFINE, TASK_REVIEW, TranslationRequest,
};
use sitewai::translation::prompts::{
    ReviewResponse, TranslationPromptBuilder, build_refinement_prompt, build_review_prompt, extract_json,
};
use sitewai::translation::{ContentItem, Section, SectionTree};

fn hero() -> Section {
    Section::new(
        "hero",
        "Hero",
        vec![
            ContentItem::new("Header", "Welcome"),
            ContentItem::new("paragraph", "We build tools."),
        ],
    )
    .with_display_title("Welcome block")
}

/// Test the translation request sent to the model
#[test]
fn test_translationPromptBuilder_build_shouldCarrySectionsAndLimits() {
    let (system, user) = TranslationPromptBuilder::new("Japanese")
        .with_sections(&[hero()])
        .with_custom_instructions("Use polite forms")
        .build();

    assert!(system.contains("Japanese"));

    let request: TranslationRequest = serde_json::from_str(&user).unwrap();
    assert_eq!(request.attempt, 0);
    assert!(request.feedback.is_empty());
    assert_eq!(request.instructions.as_deref(), Some("Use polite forms"));
    assert_eq!(request.sections[0].section_id, "hero");
    assert_eq!(request.sections[0].title, "Welcome block");
    assert_eq!(request.sections[0].items[0].item_type, "HEADER");
    assert_eq!(request.sections[0].items[0].max_chars, Some(12));
    assert_eq!(request.sections[0].items[1].item_type, "CONTENT");
    assert_eq!(request.sections[0].items[1].max_chars, Some(35));
}

/// Test that blank custom instructions are left out
#[test]
fn test_translationPromptBuilder_blankInstructions_shouldBeOmitted() {
    let user = TranslationPromptBuilder::new("French")
        .with_sections(&[hero()])
        .with_custom_instructions("   ")
        .build_user_prompt();

    assert!(!user.contains("instructions"));
    assert!(!user.contains("feedback"));
}

/// Test the regeneration request with feedback in order
#[test]
fn test_translationPromptBuilder_withFeedback_shouldKeepOrder() {
    let feedback = vec!["Reviewer: too formal".to_string(), "Attempt 1 timed out".to_string()];
    let user = TranslationPromptBuilder::new("French")
        .with_sections(&[hero()])
        .with_feedback(2, &feedback)
        .build_user_prompt();

    let request: TranslationRequest = serde_json::from_str(&user).unwrap();
    assert_eq!(request.attempt, 2);
    assert_eq!(request.feedback, feedback);
}

/// Test the review request pairing originals with translations
#[test]
fn test_buildReviewPrompt_shouldPairOriginalAndTranslation() {
    let original = vec![hero()];
    let translated = vec![hero().with_values(["Bienvenue", "Nous créons des outils."]).unwrap()];

    let (system, user) = build_review_prompt("French", &original, &translated);
    let request: ReviewRequest = serde_json::from_str(&user).unwrap();

    assert!(system.contains("French"));
    assert_eq!(request.task, TASK_REVIEW);
    assert_eq!(request.sections[0].items[1].original, "We build tools.");
    assert_eq!(request.sections[0].items[1].translated, "Nous créons des outils.");
}

/// Test the refinement request covering the whole document
#[test]
fn test_buildRefinementPrompt_shouldIncludeEverySection() {
    let tree = SectionTree::new(vec![hero(), Section::new("footer", "Footer", vec![ContentItem::new("content", "Bye")])]);

    let (_, user) = build_refinement_prompt("German", &tree);
    let request: RefinementRequest = serde_json::from_str(&user).unwrap();

    assert_eq!(request.task, TASK_REFINE);
    assert_eq!(request.target_language, "German");
    assert_eq!(request.sections.len(), 2);
    assert!(request.sections.iter().all(|s| s.items.iter().all(|i| i.max_chars.is_none())));
}

/// Test JSON extraction from typical model replies
#[test]
fn test_extractJson_withVariousReplies_shouldFindObject() {
    assert_eq!(extract_json(r#"{"passed": true}"#), Some(r#"{"passed": true}"#));
    assert_eq!(
        extract_json("```json\n{\"passed\": false}\n```").map(str::trim),
        Some(r#"{"passed": false}"#)
    );
    assert_eq!(
        extract_json(r#"Sure! Here it is: {"passed": true} Hope that helps."#),
        Some(r#"{"passed": true}"#)
    );
    assert_eq!(extract_json("no json here"), None);
}

/// Test parsing of answers with mixed item forms
#[test]
fn test_sectionsResponse_mixedItemForms_shouldYieldTexts() {
    let answer = r#"{"sections": [{"section_id": "hero", "items": ["Bienvenue", {"value": "Texte"}, {"translated": "Go"}]}]}"#;

    let response: SectionsResponse = serde_json::from_str(answer).unwrap();
    let texts: Vec<String> = response.sections[0]
        .items
        .iter()
        .cloned()
        .map(|item| item.into_text())
        .collect();

    assert_eq!(texts, vec!["Bienvenue", "Texte", "Go"]);
}

/// Test parsing of review answers
#[test]
fn test_reviewResponse_withFeedback_shouldParse() {
    let response: ReviewResponse =
        serde_json::from_str(r#"{"passed": false, "feedback": "Button too long"}"#).unwrap();

    assert!(!response.passed);
    assert_eq!(response.feedback.as_deref(), Some("Button too long"));
}
