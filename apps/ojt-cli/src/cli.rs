//! Command-line argument parsing

use clap::{Args, Parser, Subcommand};
use ojt_core::EngineKind;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "ojt",
    author = "OJT Forge Team",
    version,
    about = "Turn text, web pages and PDFs into on-the-job training documents",
    long_about = "Extracts the text of a source, splits it into learning steps sized to a\n\
                  reading-time budget and asks a language model for sections and a quiz\n\
                  per step. When the model is unavailable the original content is kept."
)]
pub struct Cli {
    /// Path to a configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "OJT_CONFIG")]
    pub config: Option<PathBuf>,

    /// API key for the cloud engine
    #[arg(short = 'k', long, env = "OJT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        env = "OJT_LOG_LEVEL",
        default_value = "warn",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "OJT_JSON_LOGS")]
    pub json_logs: bool,

    /// Show error causes
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate documents from a text file
    Text {
        /// File to read, or `-` for standard input
        input: PathBuf,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Generate documents from a web page
    Url {
        /// Page address (http or https)
        url: String,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Generate documents from a PDF file
    Pdf {
        /// PDF file to read
        file: PathBuf,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Check the quiz of a generated document or a quiz pool file
    Validate {
        /// JSON file with a document, a list of documents or a quiz array
        file: PathBuf,

        /// Minimum question length
        #[arg(long)]
        min_question_chars: Option<usize>,

        /// Exit with an error when any pool has issues
        #[arg(long)]
        strict: bool,
    },

    /// Show the effective configuration
    Config,
}

/// Options shared by the ingestion commands
#[derive(Args, Debug, Clone, Default)]
pub struct IngestArgs {
    /// Number of learning steps (planned from reading time when omitted)
    #[arg(short, long)]
    pub steps: Option<usize>,

    /// Team the documents are written for
    #[arg(short, long, default_value = "")]
    pub team: String,

    /// Document title
    #[arg(long)]
    pub title: Option<String>,

    /// Generation engine (cloud, local)
    #[arg(short, long)]
    pub engine: Option<EngineKind>,

    /// Model name for the selected engine
    #[arg(short, long)]
    pub model: Option<String>,

    /// Regenerate flagged quiz items once
    #[arg(long)]
    pub regenerate: bool,

    /// Write the result to a file instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
