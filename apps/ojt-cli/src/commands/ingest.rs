//! Shared ingestion flow for the text, url and pdf commands

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use ojt_core::{PipelineConfig, RawSource, SharedProgress};
use ojt_pipeline::{IngestOptions, SourceIngestor};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::load_config;
use crate::cli::{Cli, IngestArgs};
use crate::output::{self, IngestView, OutputFormat};

pub async fn run(cli: &Cli, source: RawSource, args: &IngestArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    apply_overrides(&mut config, args);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    spinner.set_message("Starting...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let bar = spinner.clone();
    let progress: SharedProgress = Arc::new(move |status: &str| bar.set_message(status.to_string()));

    let ingestor = SourceIngestor::builder(config).progress(progress).build()?;

    // Ctrl-C stops generation; the affected steps still come back as fallbacks
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut options = IngestOptions::default().with_team(args.team.clone()).with_cancel(cancel.clone());
    options.steps = args.steps;
    options.title = args.title.clone();

    let result = ingestor.ingest_report(source, options).await;
    listener.abort();
    spinner.finish_and_clear();

    if let Err(e) = ingestor.shutdown().await {
        warn!(error = %e, "Failed to release OCR engine");
    }

    let report = result?;

    if cancel.is_cancelled() {
        output::warning("Interrupted, unfinished steps keep their original content");
    } else if report.fallback_count() > 0 {
        output::warning(&format!(
            "{} of {} step(s) kept their original content",
            report.fallback_count(),
            report.steps.len()
        ));
    }

    let rendered = match cli.format {
        OutputFormat::Text => output::render_report(&report),
        format => output::format_output(&IngestView::from(&report), format)?,
    };
    output::emit(&rendered, args.output.as_deref())
}

fn apply_overrides(config: &mut PipelineConfig, args: &IngestArgs) {
    if let Some(engine) = args.engine {
        config.generation.engine = engine;
    }
    if let Some(model) = &args.model {
        config.generation.model = model.clone();
    }
    if args.regenerate {
        config.quiz.auto_regenerate = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ojt_core::EngineKind;

    #[test]
    fn test_apply_overrides() {
        let mut config = PipelineConfig::default();
        let args = IngestArgs {
            engine: Some(EngineKind::Local),
            model: Some("llama3".to_string()),
            regenerate: true,
            ..IngestArgs::default()
        };

        apply_overrides(&mut config, &args);

        assert_eq!(config.generation.engine, EngineKind::Local);
        assert_eq!(config.generation.model, "llama3");
        assert!(config.quiz.auto_regenerate);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = PipelineConfig::default();
        apply_overrides(&mut config, &IngestArgs::default());

        assert_eq!(config.generation.engine, EngineKind::Cloud);
        assert!(!config.quiz.auto_regenerate);
    }
}
