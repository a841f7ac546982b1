/*!
 * Translation run configuration.
 *
 * A `TranslationConfig` carries everything one translation run needs:
 * language pair, tone profile, glossary, extra protected patterns, pivot
 * and backend policy, and the post-edit toggle. Validation happens up
 * front so malformed patterns or glossary entries fail before any model
 * is touched.
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;
use crate::segmenter::compile_patterns;

/// Glossary sentinel meaning "this term must remain untranslated"
pub const GLOSSARY_KEEP: &str = "KEEP";

/// Whether a glossary target is the KEEP sentinel
pub fn is_keep_sentinel(target: &str) -> bool {
    target.eq_ignore_ascii_case(GLOSSARY_KEEP)
}

/// Register/voice/audience descriptors passed through to the post-edit prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneProfile {
    /// Formality register, e.g. "neutral", "formal", "academic"
    pub register: String,
    /// Authorial voice description
    pub voice: String,
    /// Target audience description
    pub audience: String,
    /// Humor level
    pub humor: String,
}

impl Default for ToneProfile {
    fn default() -> Self {
        Self {
            register: "neutral".to_string(),
            voice: "thoughtful essay".to_string(),
            audience: "general".to_string(),
            humor: "none".to_string(),
        }
    }
}

/// Policy selecting among direct/pivot/statistical-fallback routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPolicy {
    /// Prefer direct/pivot Marian models, fall back to NLLB
    #[default]
    MarianThenNllb,
    /// Direct/pivot Marian models only; unresolvable pairs are an error
    MarianOnly,
    /// Always use the multilingual NLLB model
    NllbOnly,
}

impl BackendPolicy {
    /// Whether the statistical fallback may be used
    pub fn allows_fallback(&self) -> bool {
        matches!(self, Self::MarianThenNllb | Self::NllbOnly)
    }

    /// Whether direct/pivot lookup is skipped entirely
    pub fn forces_fallback(&self) -> bool {
        matches!(self, Self::NllbOnly)
    }
}

/// Full configuration for one translation run
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    /// Source language code
    pub source_lang: String,
    /// Target language code
    pub target_lang: String,
    /// Tone descriptors for the post-edit prompt
    pub tone: ToneProfile,
    /// Source-term -> target-term map; "KEEP" pins a term untranslated.
    /// Ordered map so glossary substitution is deterministic.
    pub glossary: BTreeMap<String, String>,
    /// Additional regexes to protect, beyond the segmenter's built-ins
    pub protected_patterns: Vec<String>,
    /// Allow pivoting through English when no direct model exists
    pub allow_pivot_via_en: bool,
    /// Backend routing policy; may be downgraded to `NllbOnly` after a
    /// prefetch failure
    pub mt_backend: BackendPolicy,
    /// Whether to run the LLM post-edit pass
    pub postedit_enabled: bool,
}

impl TranslationConfig {
    /// Create a configuration with defaults for everything but the pair
    pub fn new(source_lang: &str, target_lang: &str) -> Self {
        Self {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            tone: ToneProfile::default(),
            glossary: BTreeMap::new(),
            protected_patterns: Vec::new(),
            allow_pivot_via_en: true,
            mt_backend: BackendPolicy::default(),
            postedit_enabled: true,
        }
    }

    /// Set the tone profile
    pub fn with_tone(mut self, tone: ToneProfile) -> Self {
        self.tone = tone;
        self
    }

    /// Set the glossary
    pub fn with_glossary(mut self, glossary: BTreeMap<String, String>) -> Self {
        self.glossary = glossary;
        self
    }

    /// Set additional protected patterns
    pub fn with_protected_patterns(mut self, patterns: Vec<String>) -> Self {
        self.protected_patterns = patterns;
        self
    }

    /// Allow or forbid pivoting through English
    pub fn with_pivot(mut self, allow: bool) -> Self {
        self.allow_pivot_via_en = allow;
        self
    }

    /// Set the backend policy
    pub fn with_backend(mut self, policy: BackendPolicy) -> Self {
        self.mt_backend = policy;
        self
    }

    /// Enable or disable the post-edit pass
    pub fn with_postedit(mut self, enabled: bool) -> Self {
        self.postedit_enabled = enabled;
        self
    }

    /// Validate patterns and glossary entries, failing fast before any
    /// translation work begins
    pub fn validate(&self) -> Result<(), ConfigError> {
        compile_patterns(&self.protected_patterns)?;
        for (term, target) in &self.glossary {
            if term.trim().is_empty() {
                return Err(ConfigError::InvalidGlossary {
                    term: term.clone(),
                    message: "source term is empty".to_string(),
                });
            }
            if target.trim().is_empty() {
                return Err(ConfigError::InvalidGlossary {
                    term: term.clone(),
                    message: "target term is empty (use \"KEEP\" to pin a term)".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Load a glossary from a JSON file containing a flat string->string map
///
/// # Errors
/// `ConfigError::GlossaryFile` when the file cannot be read or the document
/// is not a JSON object of strings.
pub fn load_glossary(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ConfigError::GlossaryFile(format!("{}: {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| ConfigError::GlossaryFile(format!("{}: {}", path.display(), e)))?;

    let object = value.as_object().ok_or_else(|| {
        ConfigError::GlossaryFile(format!(
            "{}: glossary must be a JSON object of source->target terms",
            path.display()
        ))
    })?;

    let mut glossary = BTreeMap::new();
    for (term, target) in object {
        let target = target.as_str().ok_or_else(|| {
            ConfigError::GlossaryFile(format!(
                "{}: glossary value for '{}' must be a string",
                path.display(),
                term
            ))
        })?;
        glossary.insert(term.clone(), target.to_string());
    }
    Ok(glossary)
}
