/*!
 * Machine-translation wrapper around the model registry's routing.
 *
 * `MtTranslator` resolves a route for a language pair and feeds text
 * through each step's model in sequence (a pivot route chains two hops).
 * Model handles are created lazily per model id and cached behind a
 * read-write lock; only the first caller for a given id pays the
 * construction cost, and the registry itself stays immutable.
 */

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::backends::{ModelFactory, TranslationModel};
use crate::config::{BackendPolicy, TranslationConfig};
use crate::errors::{BackendError, PipelineError};
use crate::registry::{ModelRegistry, RouteStep};

/// Executes resolved routes against the underlying model backends
pub struct MtTranslator {
    registry: Arc<ModelRegistry>,
    factory: Box<dyn ModelFactory>,
    handles: RwLock<HashMap<String, Arc<dyn TranslationModel>>>,
}

impl MtTranslator {
    /// Create a translator over `registry`, building model handles with
    /// `factory`
    pub fn new(registry: Arc<ModelRegistry>, factory: Box<dyn ModelFactory>) -> Self {
        Self {
            registry,
            factory,
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// The registry this translator routes with
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Translate one block of placeholder-protected text
    ///
    /// Resolves the route for the pair, then runs the text through each
    /// step's model; the output of step N is the input of step N+1.
    ///
    /// # Errors
    /// `PipelineError::Route` when no route exists under the policy;
    /// `PipelineError::Backend` when a model fails or produces no output.
    pub async fn translate_block(
        &self,
        text: &str,
        src_lang: &str,
        tgt_lang: &str,
        allow_pivot: bool,
        policy: BackendPolicy,
    ) -> Result<String, PipelineError> {
        let steps = self
            .registry
            .route(src_lang, tgt_lang, allow_pivot, policy)?;

        let mut current = text.to_string();
        for step in &steps {
            current = self.run_step(step, &current).await?;
        }
        Ok(current)
    }

    /// Warm up every model in a route, loading each at most once
    pub async fn prefetch(&self, steps: &[RouteStep]) -> Result<(), BackendError> {
        for step in steps {
            let handle = self.handle_for(step);
            handle.warm_up().await?;
            debug!("Prefetched model {}", step.model.model_id);
        }
        Ok(())
    }

    /// Prefetch the models for the configured pair, downgrading to the
    /// multilingual fallback when the preferred route cannot be loaded
    /// and the policy permits it
    ///
    /// Returns the policy the run should proceed with; it differs from
    /// `cfg.mt_backend` only when a downgrade happened.
    pub async fn prefetch_pair(
        &self,
        cfg: &TranslationConfig,
    ) -> Result<BackendPolicy, PipelineError> {
        let steps = self.registry.route(
            &cfg.source_lang,
            &cfg.target_lang,
            cfg.allow_pivot_via_en,
            cfg.mt_backend,
        )?;

        match self.prefetch(&steps).await {
            Ok(()) => Ok(cfg.mt_backend),
            Err(e) if cfg.mt_backend.allows_fallback() && !cfg.mt_backend.forces_fallback() => {
                warn!(
                    "Preferred MT models failed to load ({}), trying the multilingual fallback",
                    e
                );
                let fallback = self.registry.route(
                    &cfg.source_lang,
                    &cfg.target_lang,
                    cfg.allow_pivot_via_en,
                    BackendPolicy::NllbOnly,
                )?;
                self.prefetch(&fallback).await?;
                Ok(BackendPolicy::NllbOnly)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn run_step(&self, step: &RouteStep, text: &str) -> Result<String, PipelineError> {
        let handle = self.handle_for(step);
        let output = handle
            .translate(text, &step.src_lang, &step.tgt_lang)
            .await?;
        if output.trim().is_empty() {
            return Err(BackendError::EmptyOutput {
                model_id: step.model.model_id.clone(),
                src: step.src_lang.clone(),
                tgt: step.tgt_lang.clone(),
            }
            .into());
        }
        Ok(output)
    }

    /// Fetch or lazily create the handle for a step's model.
    ///
    /// Double-checked: the read lock covers the common case, and the write
    /// lock re-checks before inserting so concurrent callers for the same
    /// id end up sharing one handle.
    fn handle_for(&self, step: &RouteStep) -> Arc<dyn TranslationModel> {
        if let Some(handle) = self.handles.read().get(&step.model.model_id) {
            return Arc::clone(handle);
        }

        let mut handles = self.handles.write();
        Arc::clone(
            handles
                .entry(step.model.model_id.clone())
                .or_insert_with(|| self.factory.create(&step.model)),
        )
    }
}
