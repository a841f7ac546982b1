/*!
 * Unit tests for translation configuration and glossary loading
 */

use std::collections::BTreeMap;

use mdtrans::config::{
    BackendPolicy, GLOSSARY_KEEP, ToneProfile, TranslationConfig, is_keep_sentinel, load_glossary,
};

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_config_defaults_shouldMatchDocumentedValues() {
    let cfg = TranslationConfig::new("en", "de");

    assert!(cfg.allow_pivot_via_en);
    assert!(cfg.postedit_enabled);
    assert_eq!(cfg.mt_backend, BackendPolicy::MarianThenNllb);
    assert_eq!(cfg.tone, ToneProfile::default());
    assert!(cfg.glossary.is_empty());
}

#[test]
fn test_toneProfile_default_shouldUseNeutralEssayDefaults() {
    let tone = ToneProfile::default();

    assert_eq!(tone.register, "neutral");
    assert_eq!(tone.voice, "thoughtful essay");
    assert_eq!(tone.audience, "general");
    assert_eq!(tone.humor, "none");
}

#[test]
fn test_validate_withBadPattern_shouldFail() {
    let cfg = TranslationConfig::new("en", "de")
        .with_protected_patterns(vec!["[unclosed".to_string()]);

    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_withEmptyGlossaryTerm_shouldFail() {
    let mut glossary = BTreeMap::new();
    glossary.insert(String::new(), "target".to_string());
    let cfg = TranslationConfig::new("en", "de").with_glossary(glossary);

    assert!(cfg.validate().is_err());
}

#[test]
fn test_isKeepSentinel_shouldBeCaseInsensitive() {
    assert!(is_keep_sentinel(GLOSSARY_KEEP));
    assert!(is_keep_sentinel("keep"));
    assert!(is_keep_sentinel("Keep"));
    assert!(!is_keep_sentinel("keeper"));
}

#[test]
fn test_loadGlossary_withValidJson_shouldParseEntries() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        &dir.path().to_path_buf(),
        "glossary.json",
        r#"{"operating system": "Betriebssystem", "SaaS": "KEEP"}"#,
    )
    .unwrap();

    let glossary = load_glossary(&path).unwrap();

    assert_eq!(glossary.len(), 2);
    assert_eq!(glossary["operating system"], "Betriebssystem");
    assert_eq!(glossary["SaaS"], "KEEP");
}

#[test]
fn test_loadGlossary_withNonObjectJson_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(&dir.path().to_path_buf(), "bad.json", r#"["not", "a", "map"]"#)
        .unwrap();

    assert!(load_glossary(&path).is_err());
}

#[test]
fn test_loadGlossary_withMissingFile_shouldFail() {
    let dir = create_temp_dir().unwrap();

    assert!(load_glossary(&dir.path().join("absent.json")).is_err());
}

#[test]
fn test_backendPolicy_fallbackFlags_shouldMatchSemantics() {
    assert!(BackendPolicy::MarianThenNllb.allows_fallback());
    assert!(!BackendPolicy::MarianThenNllb.forces_fallback());
    assert!(!BackendPolicy::MarianOnly.allows_fallback());
    assert!(BackendPolicy::NllbOnly.forces_fallback());
    assert!(BackendPolicy::NllbOnly.allows_fallback());
}
