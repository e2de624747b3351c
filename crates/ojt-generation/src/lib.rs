//! AI content generation for OJT documents
//!
//! Turns a text segment into a [`GeneratedDocument`](ojt_core::GeneratedDocument)
//! with sections and a quiz pool. Generation never fails from the caller's
//! point of view: any engine error, timeout or cancellation yields a fallback
//! document holding the original text.
//!
//! # Features
//!
//! - Cloud and local engines behind one [`GenerationEngine`] trait
//! - Deadline combining a timeout with a cancellation token
//! - Best-effort repair of model JSON
//! - Quiz normalization, placeholder padding and quality validation
//! - Targeted regeneration of flagged quiz items

pub mod cloud;
pub mod deadline;
pub mod engine;
pub mod generator;
pub mod json_repair;
pub mod local;
pub mod prompt;
pub mod quiz;
pub mod regenerator;
pub mod sanitize;

use std::time::Duration;

// Re-exports
pub use cloud::{CloudEngine, CloudEngineBuilder};
pub use deadline::Deadline;
pub use engine::{engine_from_config, GenerationEngine, GenerationRequest};
pub use generator::{AiContentGenerator, GenerationState};
pub use local::LocalEngine;
pub use quiz::{fill_placeholders, normalize_item, normalize_pool, validate_pool};
pub use regenerator::QuizRegenerator;

/// Errors raised while talking to a generation engine.
///
/// These never leave [`AiContentGenerator::generate`]; they end up as the
/// `aiError` of a fallback document.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model returned no content: {0}")]
    EmptyResponse(String),

    #[error("Could not parse model output: {0}")]
    Parse(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation cancelled by user")]
    Cancelled,

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),}

impl GenerationError {
    /// True when the caller asked for the generation to stop
    pub fn is_cancellation(&self) -> bool {
        matches!(self, GenerationError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
