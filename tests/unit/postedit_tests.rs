/*!
 * Unit tests for the LLM post-edit pass
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use mdtrans::backends::mock::MockChatModel;
use mdtrans::config::TranslationConfig;
use mdtrans::errors::PostEditError;
use mdtrans::postedit::{LlmPostEditor, PostEditOptions};
use mdtrans::segmenter::MarkdownSegmenter;

fn glossary(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

#[tokio::test]
async fn test_postEdit_withFluentResponse_shouldReturnEditedText() {
    let chat = Arc::new(MockChatModel::new());
    chat.push_response("Eine flüssigere Übersetzung.");
    let editor = LlmPostEditor::new(chat.clone(), PostEditOptions::default());
    let cfg = TranslationConfig::new("en", "de");
    let protected = MarkdownSegmenter::new()
        .protect_text("A plain sentence.", &[])
        .unwrap();

    let edited = editor
        .post_edit(
            "A plain sentence.",
            "Eine einfache Übersetzung.",
            &cfg,
            &protected,
            false,
        )
        .await
        .unwrap();

    assert_eq!(edited, "Eine flüssigere Übersetzung.");
    assert_eq!(chat.call_count(), 1);
}

#[tokio::test]
async fn test_postEdit_shouldEnforceGlossaryOnModelOutput() {
    let chat = Arc::new(MockChatModel::new());
    // The model keeps the source term; deterministic substitution must fix it
    chat.push_response("Das operating system ist schnell.");
    let editor = LlmPostEditor::new(chat, PostEditOptions::default());
    let cfg = TranslationConfig::new("en", "de")
        .with_glossary(glossary(&[("operating system", "Betriebssystem")]));
    let protected = MarkdownSegmenter::new()
        .protect_text("The operating system is fast.", &[])
        .unwrap();

    let edited = editor
        .post_edit(
            "The operating system is fast.",
            "Das operating system ist schnell.",
            &cfg,
            &protected,
            false,
        )
        .await
        .unwrap();

    assert!(edited.contains("Betriebssystem"));
    assert!(!edited.contains("operating system"));
}

#[tokio::test]
async fn test_postEdit_withDroppedKeepTerm_shouldFailValidation() {
    let chat = Arc::new(MockChatModel::new());
    chat.push_response("Die Plattform ist schnell.");
    let editor = LlmPostEditor::new(chat, PostEditOptions::default());
    let cfg = TranslationConfig::new("en", "de").with_glossary(glossary(&[("SaaS", "KEEP")]));
    let protected = MarkdownSegmenter::new()
        .protect_text("The SaaS platform is fast.", &[])
        .unwrap();

    let result = editor
        .post_edit(
            "The SaaS platform is fast.",
            "Die SaaS Plattform ist schnell.",
            &cfg,
            &protected,
            false,
        )
        .await;

    assert!(matches!(result, Err(PostEditError::Validation(_))));
}

#[tokio::test]
async fn test_postEdit_withPromptOverBudget_shouldAbortWithoutCalling() {
    let chat = Arc::new(MockChatModel::new());
    let editor = LlmPostEditor::new(
        chat.clone(),
        PostEditOptions {
            max_prompt_chars: Some(10),
            ..PostEditOptions::default()
        },
    );
    let cfg = TranslationConfig::new("en", "de");
    let protected = MarkdownSegmenter::new().protect_text("text", &[]).unwrap();

    let result = editor
        .post_edit("text", "Text", &cfg, &protected, false)
        .await;

    assert!(matches!(result, Err(PostEditError::Aborted(_))));
    assert_eq!(chat.call_count(), 0);
}

#[tokio::test]
async fn test_postEdit_offline_shouldStillEnforceGlossary() {
    let editor = LlmPostEditor::offline();
    let cfg = TranslationConfig::new("en", "de")
        .with_glossary(glossary(&[("browser", "Browser")]));
    let protected = MarkdownSegmenter::new()
        .protect_text("Open the browser.", &[])
        .unwrap();

    let edited = editor
        .post_edit(
            "Open the browser.",
            "Öffne den browser.",
            &cfg,
            &protected,
            false,
        )
        .await
        .unwrap();

    assert!(edited.contains("Browser"));
}
