//! CLI command implementations

pub mod config;
pub mod ingest;
pub mod pdf;
pub mod text;
pub mod url;
pub mod validate;

use anyhow::{Context, Result};
use ojt_core::PipelineConfig;

use crate::cli::{Cli, Commands};

pub async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Text { input, ingest } => text::run(cli, input, ingest).await,
        Commands::Url { url, ingest } => url::run(cli, url, ingest).await,
        Commands::Pdf { file, ingest } => pdf::run(cli, file, ingest).await,
        Commands::Validate {
            file,
            min_question_chars,
            strict,
        } => validate::run(cli, file, *min_question_chars, *strict),
        Commands::Config => config::run(cli),
    }
}

/// Configuration from `--config` (or the environment alone), with the API key
/// flag applied on top
pub fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::load().context("Failed to load configuration from environment")?,
    };

    if let Some(key) = cli.api_key.as_deref().filter(|k| !k.is_empty()) {
        config.generation.api_key = key.to_string();
    }
    Ok(config)
}
