//! Text file command

use anyhow::{Context, Result};
use ojt_core::RawSource;
use ojt_extract::decode_text;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::cli::{Cli, IngestArgs};

pub async fn run(cli: &Cli, input: &Path, args: &IngestArgs) -> Result<()> {
    let bytes = read_input(input).await?;
    let (text, encoding) = decode_text(&bytes);
    debug!(bytes = bytes.len(), encoding, "Read text source");

    super::ingest::run(cli, RawSource::text(text), args).await
}

async fn read_input(input: &Path) -> Result<Vec<u8>> {
    if input == Path::new("-") {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("Failed to read standard input")?;
        return Ok(bytes);
    }

    tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))
}
