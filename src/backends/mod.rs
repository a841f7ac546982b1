/*!
 * Backend client traits for machine translation and LLM post-editing.
 *
 * This module defines the interfaces the pipeline consumes:
 * - `TranslationModel`: one loaded MT model, able to translate text
 * - `ModelFactory`: creates model handles from registry specs
 * - `ChatModel`: an LLM completion endpoint used by the post-editor
 *
 * Implementations:
 * - `http`: reqwest clients for an inference server and an
 *   OpenAI-compatible chat API
 * - `mock`: scriptable in-memory implementations for tests
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{BackendError, ProviderError};
use crate::registry::ModelSpec;

/// A handle to one loaded translation model
///
/// Handles are created lazily per model id and cached for the lifetime of
/// the process, so implementations should be cheap to construct and do the
/// heavy lifting in `warm_up` or on first `translate`.
#[async_trait]
pub trait TranslationModel: Send + Sync + Debug {
    /// Translate `text` for this model's language pair
    ///
    /// Multilingual models receive the requested pair; bilingual models may
    /// ignore it.
    async fn translate(
        &self,
        text: &str,
        src_lang: &str,
        tgt_lang: &str,
    ) -> Result<String, BackendError>;

    /// Ensure the model is loaded and reachable
    async fn warm_up(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Creates `TranslationModel` handles from registry specs
pub trait ModelFactory: Send + Sync {
    /// Create a handle for the given spec
    fn create(&self, spec: &ModelSpec) -> Arc<dyn TranslationModel>;
}

/// An LLM completion endpoint used for post-editing
#[async_trait]
pub trait ChatModel: Send + Sync + Debug {
    /// Run one completion and return the raw text output
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub mod http;
pub mod mock;
