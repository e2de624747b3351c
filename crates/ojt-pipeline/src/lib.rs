//! Source ingestion for OJT documents
//!
//! Wires extraction, splitting and generation into one call: a raw source
//! goes in, one generated document per learning step comes out.
//!
//! # Features
//!
//! - Synchronous input validation before any network or process work
//! - Text, URL and PDF sources behind a single `ingest` entry point
//! - Reading-time based step planning with paragraph-aligned splitting
//! - Bounded parallel generation that keeps step order
//! - Quiz validation with an optional regeneration pass

pub mod ingestor;

pub use ingestor::{IngestOptions, IngestReport, SourceIngestor, SourceIngestorBuilder, StepReport};

use ojt_extract::ExtractError;
use ojt_generation::GenerationError;

/// Errors surfaced by [`SourceIngestor::ingest`].
///
/// Only failures before generation show up here; generation problems are
/// carried by the documents themselves.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn is_input_error(&self) -> bool {
        matches!(self, IngestError::InputValidation(_))
    }
}

impl From<ExtractError> for IngestError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::InvalidInput(message) => IngestError::InputValidation(message),
            ExtractError::ExtractionFailed(message) => IngestError::ExtractionFailure(message),
            other => IngestError::ExtractionFailure(other.to_string()),
        }
    }
}

impl From<GenerationError> for IngestError {
    fn from(err: GenerationError) -> Self {
        IngestError::Config(err.to_string())
    }
}

impl From<ojt_core::ConfigError> for IngestError {
    fn from(err: ojt_core::ConfigError) -> Self {
        IngestError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
