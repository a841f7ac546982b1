/*!
 * Mock backend implementations for testing.
 *
 * - `MockTranslationModel` simulates MT behaviors: echo, word-map
 *   replacement, tagging, empty output, hard failure
 * - `MockModelFactory` hands the same scripted model to every spec
 * - `MockChatModel` replays a queue of scripted post-edit responses
 */

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backends::{ChatModel, ModelFactory, TranslationModel};
use crate::errors::{BackendError, ProviderError};
use crate::registry::{Backend, ModelSpec};

/// Behavior mode for the mock translation model
#[derive(Debug, Clone)]
pub enum MockMtBehavior {
    /// Return the input unchanged
    Echo,
    /// Replace each (from, to) word pair in the input
    ReplaceMap(Vec<(String, String)>),
    /// Append a visible tag to the input
    Tagged(String),
    /// Return an empty string (triggers `BackendError::EmptyOutput` upstream)
    Empty,
    /// Always fail with a request error
    Failing,
}

/// Mock MT model with a scriptable behavior and a shared call counter
#[derive(Debug)]
pub struct MockTranslationModel {
    behavior: MockMtBehavior,
    calls: Arc<AtomicUsize>,
    warm_up_fails: bool,
}

impl MockTranslationModel {
    /// Create a mock with the given behavior
    pub fn new(behavior: MockMtBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            warm_up_fails: false,
        }
    }

    /// Mock that echoes its input
    pub fn echo() -> Self {
        Self::new(MockMtBehavior::Echo)
    }

    /// Mock that applies a word replacement map
    pub fn replacing(pairs: &[(&str, &str)]) -> Self {
        Self::new(MockMtBehavior::ReplaceMap(
            pairs
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        ))
    }

    /// Mock that appends a tag to its input
    pub fn tagged(tag: &str) -> Self {
        Self::new(MockMtBehavior::Tagged(tag.to_string()))
    }

    /// Mock whose `warm_up` fails, for prefetch-downgrade tests
    pub fn with_failing_warm_up(mut self) -> Self {
        self.warm_up_fails = true;
        self
    }

    /// Number of translate calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn backend_error(&self, src: &str, tgt: &str, message: &str) -> BackendError {
        BackendError::RequestFailed {
            model_id: "mock".to_string(),
            src: src.to_string(),
            tgt: tgt.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl TranslationModel for MockTranslationModel {
    async fn translate(
        &self,
        text: &str,
        src_lang: &str,
        tgt_lang: &str,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockMtBehavior::Echo => Ok(text.to_string()),
            MockMtBehavior::ReplaceMap(pairs) => {
                let mut out = text.to_string();
                for (from, to) in pairs {
                    out = out.replace(from, to);
                }
                Ok(out)
            }
            MockMtBehavior::Tagged(tag) => Ok(format!("{} {}", text, tag)),
            MockMtBehavior::Empty => Ok(String::new()),
            MockMtBehavior::Failing => {
                Err(self.backend_error(src_lang, tgt_lang, "simulated backend failure"))
            }
        }
    }

    async fn warm_up(&self) -> Result<(), BackendError> {
        if self.warm_up_fails {
            Err(self.backend_error("?", "?", "simulated warm-up failure"))
        } else {
            Ok(())
        }
    }
}

/// Factory returning one shared mock model for every spec
pub struct MockModelFactory {
    model: Arc<MockTranslationModel>,
    created: Arc<AtomicUsize>,
    marian_warm_up_fails: bool,
}

impl MockModelFactory {
    /// Create a factory around one shared mock model
    pub fn new(model: MockTranslationModel) -> Self {
        Self {
            model: Arc::new(model),
            created: Arc::new(AtomicUsize::new(0)),
            marian_warm_up_fails: false,
        }
    }

    /// Make warm-up fail for Marian specs only, for downgrade tests
    pub fn with_failing_marian_warm_up(mut self) -> Self {
        self.marian_warm_up_fails = true;
        self
    }

    /// The shared model handle, for asserting on call counts
    pub fn model(&self) -> Arc<MockTranslationModel> {
        Arc::clone(&self.model)
    }

    /// Shared handle-creation counter, usable after the factory is moved
    pub fn created_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.created)
    }
}

impl ModelFactory for MockModelFactory {
    fn create(&self, spec: &ModelSpec) -> Arc<dyn TranslationModel> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if self.marian_warm_up_fails && spec.backend == Backend::Marian {
            let broken = MockTranslationModel::new(self.model.behavior.clone());
            return Arc::new(broken.with_failing_warm_up());
        }
        Arc::clone(&self.model) as Arc<dyn TranslationModel>
    }
}

/// Mock chat model replaying a queue of scripted responses
///
/// When the queue runs dry it echoes the prompt back, which fails the
/// post-editor's validation in most setups; push enough responses for the
/// scenario under test.
#[derive(Debug, Default)]
pub struct MockChatModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl MockChatModel {
    /// Create a mock with no scripted responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response
    pub fn push_response(&self, text: &str) {
        self.responses.lock().push_back(Ok(text.to_string()));
    }

    /// Queue a provider failure
    pub fn push_failure(&self, message: &str) {
        self.responses.lock().push_back(Err(message.to_string()));
    }

    /// Number of completion calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(ProviderError::RequestFailed(message)),
            None => Ok(prompt.to_string()),
        }
    }
}
