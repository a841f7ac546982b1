/*!
 * # mdtrans - Markdown-safe machine translation with LLM post-editing
 *
 * A Rust library for translating Markdown documents while preserving
 * their structure byte-for-byte where it matters.
 *
 * ## Features
 *
 * - Segment Markdown into typed blocks with lossless reconstruction
 * - Protect code, URLs, links, and custom patterns behind placeholder
 *   tokens that survive translation
 * - Route language pairs through direct Marian models, a pivot via
 *   English, or a multilingual NLLB fallback
 * - Post-edit MT drafts with an OpenAI-compatible LLM, with glossary
 *   enforcement and deterministic fallback to the MT draft
 * - Validate placeholders, numbers, and links after every stage
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `segmenter`: Markdown segmentation and placeholder protection
 * - `registry`: Model registry and deterministic route resolution
 * - `mt`: MT execution over resolved routes with handle caching
 * - `postedit`: LLM post-edit pass with glossary enforcement
 * - `pipeline`: Orchestration, stage validation, and fallbacks
 * - `config`: Translation configuration, tone profiles, glossaries
 * - `backends`: Model traits plus HTTP and mock implementations
 * - `diagnostics`: Per-stage validation records for debugging
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod backends;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod language_utils;
pub mod mt;
pub mod pipeline;
pub mod postedit;
pub mod registry;
pub mod segmenter;

// Re-export main types for easier usage
pub use config::{BackendPolicy, ToneProfile, TranslationConfig};
pub use diagnostics::{CollectingSink, DiagnosticEvent, DiagnosticSink, Stage};
pub use errors::{BackendError, ConfigError, PipelineError, PostEditError, RouteError};
pub use mt::MtTranslator;
pub use pipeline::TranslationPipeline;
pub use postedit::{LlmPostEditor, PostEditOptions};
pub use registry::{Backend, ModelRegistry, ModelSpec, RouteStep};
pub use segmenter::{BlockKind, MarkdownSegmenter, ProtectedText, TextBlock};
