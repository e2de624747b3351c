//! PDF command

use anyhow::{Context, Result};
use ojt_core::RawSource;
use std::path::Path;

use crate::cli::{Cli, IngestArgs};

pub async fn run(cli: &Cli, file: &Path, args: &IngestArgs) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);

    super::ingest::run(cli, RawSource::pdf(bytes, filename), args).await
}
