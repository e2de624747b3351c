//! Core types and configuration for the OJT ingestion pipeline.
//!
//! Everything the extraction, generation and orchestration crates exchange
//! lives here: the raw source, the extraction result, the generated document
//! and its quiz pool, plus the configuration tree and the progress observer.

pub mod config;
pub mod progress;
pub mod types;

pub use self::config::*;
pub use ::config::ConfigError;
pub use progress::{silent, ProgressObserver, SharedProgress, SilentProgress};
pub use types::*;
