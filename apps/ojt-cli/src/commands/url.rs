//! Web page command

use anyhow::Result;
use ojt_core::RawSource;

use crate::cli::{Cli, IngestArgs};

pub async fn run(cli: &Cli, url: &str, args: &IngestArgs) -> Result<()> {
    super::ingest::run(cli, RawSource::url(url), args).await
}
