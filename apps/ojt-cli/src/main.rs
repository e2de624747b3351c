//! OJT content ingestion CLI
//!
//! Turns text files, web pages and PDFs into OJT documents from the terminal.

mod cli;
mod commands;
mod output;
mod telemetry;

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

use crate::cli::Cli;
use crate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = init_telemetry(&cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        return ExitCode::FAILURE;
    }

    match commands::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            if cli.verbose {
                for cause in e.chain().skip(1) {
                    eprintln!("{}: {}", "Caused by".yellow(), cause);
                }
            }
            ExitCode::FAILURE
        }
    }
}
