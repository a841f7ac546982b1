/*!
 * Translation pipeline orchestrating segmentation, MT, post-edit, and
 * stage validation.
 *
 * Per translatable block the pipeline runs: protect -> MT -> validate ->
 * (widened-protection retry when invalid) -> post-edit (non-strict, then
 * strict, then MT-draft fallback) -> restore -> validate -> fall back to
 * the validated MT output when the post-edited result fails the checks.
 * Code blocks, frontmatter, and blank runs pass through untouched.
 *
 * The pipeline never emits text that fails the structural checks while an
 * alternative that passes is available; when even the MT stage failed, the
 * best-effort result is emitted rather than aborting the document.
 */

use std::sync::Arc;

use log::{debug, error, warn};

use crate::config::TranslationConfig;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, NoopSink, Stage};
use crate::errors::{PipelineError, PostEditError};
use crate::mt::MtTranslator;
use crate::postedit::LlmPostEditor;
use crate::segmenter::{MarkdownSegmenter, ProtectedText, TextBlock};

/// Pattern protecting bare numeric literals, added on the MT retry
const NUMERIC_LITERAL_PATTERN: &str = r"\d+(?:[.,:/-]\d+)*";

/// Coordinates Markdown-safe translation across the MT and LLM stages
pub struct TranslationPipeline {
    segmenter: MarkdownSegmenter,
    mt: MtTranslator,
    postedit: LlmPostEditor,
    sink: Arc<dyn DiagnosticSink>,
}

impl TranslationPipeline {
    /// Create a pipeline with a no-op diagnostic sink
    pub fn new(mt: MtTranslator, postedit: LlmPostEditor) -> Self {
        Self {
            segmenter: MarkdownSegmenter::new(),
            mt,
            postedit,
            sink: Arc::new(NoopSink),
        }
    }

    /// Attach a diagnostic sink receiving one record per stage attempted
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The segmenter used by this pipeline
    pub fn segmenter(&self) -> &MarkdownSegmenter {
        &self.segmenter
    }

    /// Translate a full Markdown document
    ///
    /// # Errors
    /// `Config` for invalid patterns/glossary (before any work),
    /// `Route` when the language pair is unroutable, and
    /// `StructuralIntegrity` when the block count changes (a pipeline bug,
    /// never a user condition).
    pub async fn translate(
        &self,
        text: &str,
        cfg: &TranslationConfig,
    ) -> Result<String, PipelineError> {
        cfg.validate()?;

        let blocks = self.segmenter.segment(text);
        let translated = self.translate_blocks(&blocks, cfg).await?;
        self.reconstruct_checked(&blocks, &translated)
    }

    /// Translate an already-segmented block list, preserving structure
    pub async fn translate_blocks(
        &self,
        blocks: &[TextBlock],
        cfg: &TranslationConfig,
    ) -> Result<Vec<TextBlock>, PipelineError> {
        let mut translated = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            if !block.is_translatable() {
                translated.push(block.clone());
                continue;
            }
            let updated = self.translate_block(block, cfg, index).await?;
            translated.push(block.with_text(updated));
        }
        Ok(translated)
    }

    /// Reassemble the document, refusing to emit output when the block
    /// count changed
    pub fn reconstruct_checked(
        &self,
        original: &[TextBlock],
        translated: &[TextBlock],
    ) -> Result<String, PipelineError> {
        if translated.len() != original.len() {
            error!(
                "Block count changed during translation: {} -> {}",
                original.len(),
                translated.len()
            );
            return Err(PipelineError::StructuralIntegrity {
                expected: original.len(),
                actual: translated.len(),
            });
        }
        Ok(self.segmenter.reconstruct(translated))
    }

    /// Translate one block through the full retry/fallback ladder
    async fn translate_block(
        &self,
        block: &TextBlock,
        cfg: &TranslationConfig,
        index: usize,
    ) -> Result<String, PipelineError> {
        let mut protected = self
            .segmenter
            .protect_text(&block.text, &cfg.protected_patterns)?;

        let mut mt_output = match self.run_mt(&protected.text, cfg).await? {
            Some(output) => output,
            // Backend gave up on the first attempt; retry below with
            // widened protections before skipping the block.
            None => String::new(),
        };
        let mut mt_restored = protected.restore(&mt_output);
        let mt_valid = !mt_output.is_empty()
            && self.validate_stage(
                Stage::Mt,
                index,
                &block.text,
                &mt_output,
                &mt_restored,
                &protected,
            );

        if !mt_valid {
            let mut widened_patterns = cfg.protected_patterns.clone();
            widened_patterns.push(NUMERIC_LITERAL_PATTERN.to_string());
            let widened = self.segmenter.protect_text(&block.text, &widened_patterns)?;

            match self.run_mt(&widened.text, cfg).await? {
                Some(output) => {
                    // Token indices differ between protection passes, so
                    // the widened map only applies to the retry's output.
                    protected = widened;
                    mt_output = output;
                    mt_restored = protected.restore(&mt_output);
                    // Recorded for diagnostics but never gating; the
                    // pipeline proceeds with the best-effort retry output.
                    self.validate_stage(
                        Stage::MtRetry,
                        index,
                        &block.text,
                        &mt_output,
                        &mt_restored,
                        &protected,
                    );
                }
                None => {
                    if mt_output.is_empty() {
                        // Both attempts failed at the backend. Leave the
                        // block untranslated rather than dropping content.
                        warn!(
                            "Block {} left untranslated after repeated backend failures",
                            index
                        );
                        return Ok(block.text.clone());
                    }
                }
            }
        }

        let candidate = if cfg.postedit_enabled {
            self.run_postedit(&block.text, &mt_output, cfg, &protected, index)
                .await
        } else {
            mt_output.clone()
        };

        let final_text = protected.restore(&candidate);
        let postedit_valid = self.validate_stage(
            Stage::Postedit,
            index,
            &block.text,
            &candidate,
            &final_text,
            &protected,
        );

        if postedit_valid {
            Ok(final_text)
        } else {
            debug!(
                "Block {}: post-edit result failed structural checks, using MT output",
                index
            );
            Ok(mt_restored)
        }
    }

    /// Run MT for one protected text; `Ok(None)` means the backend failed
    /// and the caller decides how to degrade
    async fn run_mt(
        &self,
        protected_text: &str,
        cfg: &TranslationConfig,
    ) -> Result<Option<String>, PipelineError> {
        match self
            .mt
            .translate_block(
                protected_text,
                &cfg.source_lang,
                &cfg.target_lang,
                cfg.allow_pivot_via_en,
                cfg.mt_backend,
            )
            .await
        {
            Ok(output) => Ok(Some(output)),
            // Routing failures abort the document; backend failures are
            // degraded locally.
            Err(PipelineError::Route(e)) => Err(e.into()),
            Err(PipelineError::Backend(e)) => {
                warn!("MT backend failure: {}", e);
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    /// Non-strict post-edit, strict retry, then fallback to the MT draft
    ///
    /// An abort (prompt over budget) skips the strict retry, since a
    /// second attempt with the same prompt cannot succeed.
    async fn run_postedit(
        &self,
        source_text: &str,
        mt_draft: &str,
        cfg: &TranslationConfig,
        protected: &ProtectedText,
        index: usize,
    ) -> String {
        let first = self
            .postedit
            .post_edit(source_text, mt_draft, cfg, protected, false)
            .await;

        let failure = match first {
            Ok(edited) => return edited,
            Err(PostEditError::Aborted(message)) => {
                self.sink.record(DiagnosticEvent::PosteditFallback {
                    block_index: index,
                    message: format!("post-edit aborted: {}", message),
                });
                return mt_draft.to_string();
            }
            Err(e) => e,
        };
        debug!("Block {}: post-edit attempt failed ({}), retrying strict", index, failure);

        match self
            .postedit
            .post_edit(source_text, mt_draft, cfg, protected, true)
            .await
        {
            Ok(edited) => edited,
            Err(e) => {
                self.sink.record(DiagnosticEvent::PosteditFallback {
                    block_index: index,
                    message: format!("post-edit failed twice, using MT draft: {}", e),
                });
                mt_draft.to_string()
            }
        }
    }

    /// Run the three structural checks for one stage and record the result
    fn validate_stage(
        &self,
        stage: Stage,
        block_index: usize,
        source_text: &str,
        candidate: &str,
        restored: &str,
        protected: &ProtectedText,
    ) -> bool {
        let placeholders_ok = protected.tokens().all(|token| candidate.contains(token));
        let numbers_ok = multisets_match(
            self.segmenter.extract_numbers(source_text),
            self.segmenter.extract_numbers(restored),
        );
        let links_ok = multisets_match(
            self.segmenter.extract_links(source_text),
            self.segmenter.extract_links(restored),
        );

        debug!(
            "Stage {:?} block {}: placeholders={} numbers={} links={}",
            stage, block_index, placeholders_ok, numbers_ok, links_ok
        );
        self.sink.record(DiagnosticEvent::StageValidated {
            stage,
            block_index,
            placeholders_ok,
            numbers_ok,
            links_ok,
            candidate: candidate.to_string(),
            restored: restored.to_string(),
        });

        placeholders_ok && numbers_ok && links_ok
    }
}

/// Order-independent comparison of extracted values
fn multisets_match(mut left: Vec<String>, mut right: Vec<String>) -> bool {
    left.sort();
    right.sort();
    left == right
}
