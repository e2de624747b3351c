//! Logging initialization
//!
//! Logs go to standard error so rendered documents on standard output stay
//! machine readable.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;

/// Install the global subscriber. `RUST_LOG` wins over `--log-level`.
pub fn init_telemetry(cli: &Cli) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("Failed to create environment filter")?;

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_ansi(!cli.no_color)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}
