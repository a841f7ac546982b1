/*!
 * Model registry and deterministic language-pair routing.
 *
 * The registry holds the known bilingual model specs and resolves a route
 * for an arbitrary language pair: direct model first, then a pivot through
 * English, then the multilingual statistical fallback when the backend
 * policy permits it. Routing is fully deterministic: same registry state
 * and inputs always produce the same route.
 */

use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::config::BackendPolicy;
use crate::errors::RouteError;

/// Language used as the intermediate hop for pivot routes
pub const PIVOT_LANG: &str = "en";

/// Default identifier for the multilingual statistical fallback model
pub const DEFAULT_NLLB_MODEL_ID: &str = "facebook/nllb-200-distilled-600M";

/// Kind of translation model behind a spec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Marian-style bilingual model for one fixed language pair
    Marian,
    /// Multilingual statistical model usable for any pair
    Nllb,
}

/// Routing metadata for a single translation model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    /// Model identifier understood by the backend
    pub model_id: String,
    /// Source language the model translates from
    pub src_lang: String,
    /// Target language the model translates to
    pub tgt_lang: String,
    /// Backend kind
    pub backend: Backend,
    /// Disabled specs are skipped during lookup
    pub disabled: bool,
}

impl ModelSpec {
    /// Create an enabled spec
    pub fn new(model_id: &str, src_lang: &str, tgt_lang: &str, backend: Backend) -> Self {
        Self {
            model_id: model_id.to_string(),
            src_lang: src_lang.to_string(),
            tgt_lang: tgt_lang.to_string(),
            backend,
            disabled: false,
        }
    }

    /// Mark the spec as disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// One hop in a resolved translation route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStep {
    /// Source language for this hop
    pub src_lang: String,
    /// Target language for this hop
    pub tgt_lang: String,
    /// Model serving this hop
    pub model: ModelSpec,
}

/// Registry for deterministic routing between language pairs
///
/// Read-only after construction and safe for concurrent use.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    specs: Vec<ModelSpec>,
    nllb_model_id: String,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(default_specs())
    }
}

impl ModelRegistry {
    /// Create a registry from explicit specs
    pub fn new(specs: Vec<ModelSpec>) -> Self {
        Self {
            specs,
            nllb_model_id: DEFAULT_NLLB_MODEL_ID.to_string(),
        }
    }

    /// Override the statistical fallback model identifier
    pub fn with_nllb_model_id(mut self, model_id: &str) -> Self {
        self.nllb_model_id = model_id.to_string();
        self
    }

    /// Normalize a language code for comparison
    ///
    /// NLLB script tags such as `deu_Latn` keep their casing; the script
    /// part is case-significant on the wire.
    pub fn normalize_lang(&self, lang: &str) -> String {
        let trimmed = lang.trim();
        if trimmed.contains('_') {
            trimmed.to_string()
        } else {
            trimmed.to_lowercase()
        }
    }

    /// Find an enabled direct model for a pair
    pub fn find_direct(&self, src_lang: &str, tgt_lang: &str) -> Option<&ModelSpec> {
        let src = self.normalize_lang(src_lang);
        let tgt = self.normalize_lang(tgt_lang);
        self.specs.iter().find(|spec| {
            !spec.disabled
                && self.normalize_lang(&spec.src_lang) == src
                && self.normalize_lang(&spec.tgt_lang) == tgt
        })
    }

    /// The multilingual statistical fallback spec
    pub fn nllb_spec(&self) -> ModelSpec {
        ModelSpec::new(&self.nllb_model_id, "multi", "multi", Backend::Nllb)
    }

    /// All (src, tgt) pairs with a direct model, for prefetching/tooling
    pub fn supported_pairs(&self) -> HashSet<(String, String)> {
        self.specs
            .iter()
            .filter(|spec| !spec.disabled)
            .map(|spec| {
                (
                    self.normalize_lang(&spec.src_lang),
                    self.normalize_lang(&spec.tgt_lang),
                )
            })
            .collect()
    }

    /// Resolve a deterministic route for a language pair
    ///
    /// Order: direct model, pivot through English (both legs direct), then
    /// the statistical fallback when `policy` permits it. A `NllbOnly`
    /// policy skips direct and pivot lookup entirely.
    ///
    /// # Errors
    /// `RouteError::NoRoute` when nothing resolves under the given policy.
    pub fn route(
        &self,
        src_lang: &str,
        tgt_lang: &str,
        allow_pivot: bool,
        policy: BackendPolicy,
    ) -> Result<Vec<RouteStep>, RouteError> {
        let src = self.normalize_lang(src_lang);
        let tgt = self.normalize_lang(tgt_lang);

        if !policy.forces_fallback() {
            if let Some(direct) = self.find_direct(&src, &tgt) {
                debug!("Direct route {}->{} via {}", src, tgt, direct.model_id);
                return Ok(vec![RouteStep {
                    src_lang: src,
                    tgt_lang: tgt,
                    model: direct.clone(),
                }]);
            }

            if let Some(steps) = self.pivot_route(&src, &tgt, allow_pivot) {
                debug!(
                    "Pivot route {}->{} via {} and {}",
                    src, tgt, steps[0].model.model_id, steps[1].model.model_id
                );
                return Ok(steps);
            }
        }

        if policy.allows_fallback() {
            debug!("Fallback route {}->{} via {}", src, tgt, self.nllb_model_id);
            return Ok(vec![RouteStep {
                src_lang: src,
                tgt_lang: tgt,
                model: self.nllb_spec(),
            }]);
        }

        Err(RouteError::NoRoute { src, tgt })
    }

    fn pivot_route(&self, src: &str, tgt: &str, allow_pivot: bool) -> Option<Vec<RouteStep>> {
        if !allow_pivot || src == PIVOT_LANG || tgt == PIVOT_LANG {
            return None;
        }
        let first = self.find_direct(src, PIVOT_LANG)?;
        let second = self.find_direct(PIVOT_LANG, tgt)?;
        Some(vec![
            RouteStep {
                src_lang: src.to_string(),
                tgt_lang: PIVOT_LANG.to_string(),
                model: first.clone(),
            },
            RouteStep {
                src_lang: PIVOT_LANG.to_string(),
                tgt_lang: tgt.to_string(),
                model: second.clone(),
            },
        ])
    }
}

/// Default Helsinki-NLP opus-mt bilingual pairs
fn default_specs() -> Vec<ModelSpec> {
    const PAIRS: &[(&str, &str, &str)] = &[
        ("en", "de", "Helsinki-NLP/opus-mt-en-de"),
        ("de", "en", "Helsinki-NLP/opus-mt-de-en"),
        ("en", "es", "Helsinki-NLP/opus-mt-en-es"),
        ("es", "en", "Helsinki-NLP/opus-mt-es-en"),
        ("en", "fr", "Helsinki-NLP/opus-mt-en-fr"),
        ("fr", "en", "Helsinki-NLP/opus-mt-fr-en"),
        ("en", "it", "Helsinki-NLP/opus-mt-en-it"),
        ("it", "en", "Helsinki-NLP/opus-mt-it-en"),
        ("en", "pt", "Helsinki-NLP/opus-mt-en-pt"),
        ("pt", "en", "Helsinki-NLP/opus-mt-pt-en"),
        ("de", "es", "Helsinki-NLP/opus-mt-de-es"),
        ("de", "fr", "Helsinki-NLP/opus-mt-de-fr"),
        ("de", "it", "Helsinki-NLP/opus-mt-de-it"),
        ("de", "pt", "Helsinki-NLP/opus-mt-de-pt"),
    ];

    PAIRS
        .iter()
        .map(|(src, tgt, model_id)| ModelSpec::new(model_id, src, tgt, Backend::Marian))
        .collect()
}
