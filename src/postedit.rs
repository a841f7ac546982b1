/*!
 * LLM post-edit pass over machine-translation drafts.
 *
 * The post-editor asks an LLM to improve fluency and tone while keeping
 * meaning, Markdown structure, protected placeholder tokens, and glossary
 * terms intact. None of those constraints are trusted from the model:
 * glossary substitution is applied deterministically afterwards and the
 * output is validated, so a misbehaving model degrades to the MT draft
 * rather than corrupting the document.
 *
 * With no chat model configured the editor degenerates to deterministic
 * glossary substitution over the draft, still subject to validation.
 */

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::timeout;

use crate::backends::ChatModel;
use crate::config::{TranslationConfig, is_keep_sentinel};
use crate::errors::PostEditError;
use crate::segmenter::ProtectedText;

/// Default wall-clock budget for one LLM call
pub const DEFAULT_POSTEDIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Tunable options for the post-edit pass
#[derive(Debug, Clone)]
pub struct PostEditOptions {
    /// Maximum characters allowed in the assembled prompt; `None` disables
    /// the budget
    pub max_prompt_chars: Option<usize>,
    /// Wall-clock budget for one LLM call
    pub timeout: Duration,
}

impl Default for PostEditOptions {
    fn default() -> Self {
        Self {
            max_prompt_chars: Some(4_000),
            timeout: DEFAULT_POSTEDIT_TIMEOUT,
        }
    }
}

/// Post-edit pass to improve tone and idioms while preserving structure
pub struct LlmPostEditor {
    chat: Option<Arc<dyn ChatModel>>,
    options: PostEditOptions,
}

impl LlmPostEditor {
    /// Create a post-editor backed by `chat`
    pub fn new(chat: Arc<dyn ChatModel>, options: PostEditOptions) -> Self {
        Self {
            chat: Some(chat),
            options,
        }
    }

    /// Create an offline post-editor: deterministic glossary substitution
    /// only, no LLM involved
    pub fn offline() -> Self {
        Self {
            chat: None,
            options: PostEditOptions::default(),
        }
    }

    /// Run one post-edit attempt and return the corrected translation
    ///
    /// `strict` adds an instruction to return the MT draft verbatim when
    /// uncertain; the pipeline calls this at most twice per block (once
    /// non-strict, once strict) before falling back to the raw draft.
    ///
    /// # Errors
    /// - `PostEditError::Aborted` when the prompt exceeds the budget
    /// - `PostEditError::Timeout` when the LLM call runs over
    /// - `PostEditError::Validation` for any constraint violation
    pub async fn post_edit(
        &self,
        source_text: &str,
        mt_draft: &str,
        cfg: &TranslationConfig,
        protected: &ProtectedText,
        strict: bool,
    ) -> Result<String, PostEditError> {
        let Some(chat) = &self.chat else {
            let enforced = apply_glossary(mt_draft, &cfg.glossary);
            validate_output(&enforced, protected, &cfg.glossary)?;
            return Ok(enforced);
        };

        let prompt = build_prompt(source_text, mt_draft, cfg, protected, strict);
        if let Some(budget) = self.options.max_prompt_chars {
            if prompt.len() > budget {
                return Err(PostEditError::Aborted(format!(
                    "prompt is {} chars, budget is {}",
                    prompt.len(),
                    budget
                )));
            }
        }

        debug!(
            "Post-edit call (strict={}, {} chars prompt)",
            strict,
            prompt.len()
        );

        let output = match timeout(self.options.timeout, chat.complete(&prompt)).await {
            Err(_) => {
                warn!("Post-edit call timed out after {:?}", self.options.timeout);
                return Err(PostEditError::Timeout(self.options.timeout));
            }
            Ok(Err(e)) => return Err(PostEditError::Validation(e.to_string())),
            Ok(Ok(output)) => output,
        };

        let enforced = apply_glossary(&output, &cfg.glossary);
        validate_output(&enforced, protected, &cfg.glossary)?;
        Ok(enforced)
    }
}

/// Build the post-edit prompt for one block
fn build_prompt(
    source_text: &str,
    mt_draft: &str,
    cfg: &TranslationConfig,
    protected: &ProtectedText,
    strict: bool,
) -> String {
    let tokens: Vec<&str> = protected.tokens().collect();
    let mut constraints = vec![
        "Preserve meaning exactly; do not add or remove claims.".to_string(),
        "Keep Markdown structure, spacing, and list markers unchanged.".to_string(),
        format!("Do not alter protected tokens: {}", tokens.join(", ")),
        "Preserve URLs, IDs, file names, and numeric values.".to_string(),
        "Replace idioms with natural equivalents; otherwise paraphrase lightly.".to_string(),
    ];
    if strict {
        constraints.push("If uncertain, return the MT draft verbatim.".to_string());
    }

    let glossary_section = if cfg.glossary.is_empty() {
        "none".to_string()
    } else {
        cfg.glossary
            .iter()
            .map(|(src, tgt)| format!("- {} -> {}", src, tgt))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let constraint_lines = constraints
        .iter()
        .map(|line| format!("- {}", line))
        .collect::<Vec<_>>()
        .join("\n");

    let tone = &cfg.tone;
    format!(
        "You are a post-editor improving a machine translation.\n\
         Tone: register={}, voice={}, audience={}, humor={}.\n\
         Constraints:\n{}\n\
         Glossary:\n{}\n\
         SOURCE TEXT:\n{}\n\n\
         MT DRAFT:\n{}\n\n\
         Return only the corrected translation.",
        tone.register,
        tone.voice,
        tone.audience,
        tone.humor,
        constraint_lines,
        glossary_section,
        source_text,
        mt_draft
    )
}

/// Deterministically enforce glossary targets in `text`
///
/// KEEP entries are left alone here (their survival is checked by
/// validation); for other entries the source term is replaced by the
/// target unless the target already appears.
fn apply_glossary(text: &str, glossary: &BTreeMap<String, String>) -> String {
    let mut translation = text.to_string();
    for (source, target) in glossary {
        if is_keep_sentinel(target) {
            continue;
        }
        if !translation.contains(target.as_str()) {
            translation = translation.replace(source.as_str(), target.as_str());
        }
    }
    translation
}

/// Validate placeholder survival and glossary enforcement
fn validate_output(
    text: &str,
    protected: &ProtectedText,
    glossary: &BTreeMap<String, String>,
) -> Result<(), PostEditError> {
    for token in protected.tokens() {
        if !text.contains(token) {
            return Err(PostEditError::Validation(format!(
                "protected token missing: {}",
                token
            )));
        }
    }
    for (source, target) in glossary {
        if is_keep_sentinel(target) {
            if !text.contains(source.as_str()) {
                return Err(PostEditError::Validation(format!(
                    "term marked KEEP missing: {}",
                    source
                )));
            }
        } else if !text.contains(target.as_str()) {
            return Err(PostEditError::Validation(format!(
                "glossary target not enforced: {}",
                target
            )));
        }
    }
    Ok(())
}
