/*!
 * Error types for the mdtrans library.
 *
 * This module contains custom error types for each stage of the translation
 * pipeline, using the thiserror crate for ergonomic error definitions.
 *
 * Propagation policy: post-edit failures are recovered locally inside the
 * pipeline and never surface to callers. Configuration and routing errors
 * are raised before translation starts. A structural-integrity failure is
 * always fatal and indicates a pipeline bug.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or validating a translation configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A user-supplied protected pattern failed to compile
    #[error("Invalid protected pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending regex source
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// A glossary entry is malformed
    #[error("Invalid glossary entry '{term}': {message}")]
    InvalidGlossary {
        /// The source-side glossary term
        term: String,
        /// What was wrong with it
        message: String,
    },

    /// A glossary file could not be read or parsed
    #[error("Failed to load glossary: {0}")]
    GlossaryFile(String),
}

/// Errors raised by the model registry when resolving a route
#[derive(Error, Debug)]
pub enum RouteError {
    /// No direct, pivot, or fallback route exists for the pair
    #[error("No translation route found for {src}->{tgt}")]
    NoRoute {
        /// Requested source language
        src: String,
        /// Requested target language
        tgt: String,
    },
}

/// Errors raised by an underlying machine-translation model
#[derive(Error, Debug)]
pub enum BackendError {
    /// The request to the model backend failed outright
    #[error("Model '{model_id}' ({src}->{tgt}) request failed: {message}")]
    RequestFailed {
        /// Model identifier for the failing step
        model_id: String,
        /// Step source language
        src: String,
        /// Step target language
        tgt: String,
        /// Underlying failure description
        message: String,
    },

    /// The model responded but produced no usable output
    #[error("Model '{model_id}' returned no output for {src}->{tgt}")]
    EmptyOutput {
        /// Model identifier for the failing step
        model_id: String,
        /// Step source language
        src: String,
        /// Step target language
        tgt: String,
    },
}

/// Errors that can occur when working with LLM provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },
}

/// Errors raised by the post-edit pass
///
/// All variants are recovered inside the pipeline (strict retry, then
/// fallback to the raw MT draft); none of them escape `translate`.
#[derive(Error, Debug)]
pub enum PostEditError {
    /// The post-edit output violated a structural guarantee
    #[error("Post-edit output failed validation: {0}")]
    Validation(String),

    /// The post-edit pass refused to run (e.g. prompt over budget)
    #[error("Post-edit aborted: {0}")]
    Aborted(String),

    /// The LLM call exceeded the configured timeout
    #[error("Post-edit call timed out after {0:?}")]
    Timeout(Duration),
}

/// Top-level pipeline error type
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration was invalid; no translation work was attempted
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No route could be resolved for the requested language pair
    #[error("Routing error: {0}")]
    Route(#[from] RouteError),

    /// A machine-translation backend failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Block count changed during translation; indicates a pipeline bug
    #[error("Block structure changed during translation: expected {expected} blocks, got {actual}")]
    StructuralIntegrity {
        /// Number of blocks produced by segmentation
        expected: usize,
        /// Number of blocks after translation
        actual: usize,
    },
}
