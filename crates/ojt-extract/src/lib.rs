//! Text extraction for OJT sources
//!
//! Turns the raw inputs of an ingestion request into normalized plain text.
//!
//! # Features
//!
//! - Request-forgery guard for user supplied URLs
//! - Ordered relay chain for fetching remote pages
//! - HTML stripping with Open Graph metadata
//! - PDF text layer extraction with an OCR fallback
//! - Paragraph-aligned splitting sized to a reading-time budget

pub mod html;
pub mod ocr;
pub mod pdf;
pub mod proxy;
pub mod splitter;
pub mod strategy;
pub mod text;
pub mod url_guard;

use std::time::Duration;

// Re-exports
pub use html::{extract_html, extract_metadata, UrlTextExtractor};
pub use ocr::{
    OcrEngine, OcrEngineProvider, OcrHandle, PageRasterizer, PdftoppmRasterizer, TesseractEngine,
    TesseractProvider,
};
pub use pdf::{validate_pdf, PdfTextExtractor};
pub use proxy::{ProxyChain, RelayFetcher};
pub use splitter::{plan_steps, split};
pub use strategy::{Strategy, StrategyChain};
pub use text::{decode_text, extract_plain};
pub use url_guard::check_url;

/// Error types for extraction operations
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("All {attempts} strategies failed, last was '{last_strategy}': {last_error}")]
    Exhausted {
        attempts: usize,
        last_strategy: String,
        last_error: Box<ExtractError>,
    },

    #[error("No strategies configured")]
    NoStrategies,

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// True for errors caused by the caller's input rather than by extraction
    pub fn is_input_error(&self) -> bool {
        matches!(self, ExtractError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractError::Exhausted {
            attempts: 2,
            last_strategy: "codetabs".to_string(),
            last_error: Box::new(ExtractError::Relay("status 403".to_string())),
        };
        let message = err.to_string();
        assert!(message.contains("codetabs"));
        assert!(message.contains("status 403"));
    }

    #[test]
    fn test_input_error_classification() {
        assert!(ExtractError::InvalidInput("empty".into()).is_input_error());
        assert!(!ExtractError::ExtractionFailed("noise".into()).is_input_error());
    }
}
