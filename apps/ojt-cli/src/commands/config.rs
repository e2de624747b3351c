//! Effective configuration command

use anyhow::Result;
use ojt_core::PipelineConfig;

use crate::cli::Cli;
use crate::output::{self, OutputFormat};

const REDACTED: &str = "[REDACTED]";

pub fn run(cli: &Cli) -> Result<()> {
    let config = redacted(super::load_config(cli)?);

    let rendered = match cli.format {
        OutputFormat::Text => toml::to_string_pretty(&config)?,
        format => output::format_output(&config, format)?,
    };
    output::emit(&rendered, None)
}

fn redacted(mut config: PipelineConfig) -> PipelineConfig {
    if !config.generation.api_key.is_empty() {
        config.generation.api_key = REDACTED.to_string();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_redacted() {
        let mut config = PipelineConfig::default();
        config.generation.api_key = "sk-live-123".to_string();

        let shown = toml::to_string_pretty(&redacted(config)).unwrap();
        assert!(!shown.contains("sk-live-123"));
        assert!(shown.contains(REDACTED));
    }

    #[test]
    fn test_empty_key_left_empty() {
        let config = redacted(PipelineConfig::default());
        assert!(config.generation.api_key.is_empty());
    }
}
