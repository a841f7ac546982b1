/*!
 * Pluggable diagnostic sink for per-block, per-stage pipeline records.
 *
 * The pipeline emits one event per stage attempted, pass or fail, so a
 * consumer can reconstruct exactly what happened to every block. The sink
 * is an injected collaborator (no-op by default) rather than shared module
 * state, so concurrent translations never mix their diagnostics.
 */

use parking_lot::Mutex;
use serde::Serialize;

/// Validation stage identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// First machine-translation attempt
    Mt,
    /// Widened-protection retry; recorded but never gating
    MtRetry,
    /// Post-edit (or MT passthrough when post-edit is disabled)
    Postedit,
}

/// A single diagnostic event emitted by the pipeline
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// A validation stage ran for a block
    StageValidated {
        /// Which stage was validated
        stage: Stage,
        /// Index of the block in document order
        block_index: usize,
        /// All placeholder tokens survived in the candidate
        placeholders_ok: bool,
        /// Numeric literals match the source as a multiset
        numbers_ok: bool,
        /// URLs/link targets match the source as a multiset
        links_ok: bool,
        /// Candidate text, still carrying placeholder tokens
        candidate: String,
        /// Candidate text with placeholders restored
        restored: String,
    },
    /// Post-editing gave up for a block and the MT draft was used
    PosteditFallback {
        /// Index of the block in document order
        block_index: usize,
        /// Why post-editing was abandoned
        message: String,
    },
}

/// Receiver for pipeline diagnostic events
pub trait DiagnosticSink: Send + Sync {
    /// Record one event
    fn record(&self, event: DiagnosticEvent);
}

/// Sink that discards every event; the pipeline default
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&self, _event: DiagnosticEvent) {}
}

/// Sink that buffers events in memory for later inspection or serialization
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CollectingSink {
    /// Create an empty collecting sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far, in emission order
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, event: DiagnosticEvent) {
        self.events.lock().push(event);
    }
}
