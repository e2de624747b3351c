//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use ojt_core::{ExtractionMethod, GeneratedDocument, PageMetadata, QuizValidationReport};
use ojt_pipeline::IngestReport;
use serde::Serialize;
use std::path::Path;

/// Output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Serializable view of an ingestion, without the extracted text itself
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestView<'a> {
    pub title: &'a str,
    pub method: ExtractionMethod,
    pub original_length: usize,
    pub extracted_length: usize,
    pub was_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a PageMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: &'a Vec<String>,
    pub documents: Vec<&'a GeneratedDocument>,
    pub quiz_reports: Vec<&'a QuizValidationReport>,
}

impl<'a> From<&'a IngestReport> for IngestView<'a> {
    fn from(report: &'a IngestReport) -> Self {
        let extraction = &report.extraction;
        Self {
            title: &report.title,
            method: extraction.method,
            original_length: extraction.original_length,
            extracted_length: extraction.extracted_length,
            was_truncated: extraction.was_truncated,
            page_count: extraction.page_count,
            metadata: extraction.metadata.as_ref(),
            warnings: &extraction.warnings,
            documents: report.documents().collect(),
            quiz_reports: report.steps.iter().map(|step| &step.validation).collect(),
        }
    }
}

/// Serialize `value` as JSON or YAML
pub fn format_output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json | OutputFormat::Text => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
    }
}

/// Write `content` to `path`, or to standard output when no path is given
pub fn emit(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)?;
            success(&format!("Wrote {}", path.display()));
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Human-readable rendering of an ingestion
pub fn render_report(report: &IngestReport) -> String {
    let extraction = &report.extraction;
    let mut out = String::new();

    out.push_str(&format!("{}\n", report.title.bold().underline()));
    out.push_str(&format!(
        "{} {} chars via {}{}\n",
        "Source:".bold(),
        extraction.extracted_length,
        extraction.method,
        if extraction.was_truncated {
            format!(" (truncated from {})", extraction.original_length)
        } else {
            String::new()
        }
    ));
    for warning in &extraction.warnings {
        out.push_str(&format!("{} {}\n", "⚠".yellow(), warning));
    }

    for step in &report.steps {
        out.push('\n');
        out.push_str(&render_document(&step.document));
        out.push_str(&render_validation(&step.validation));
    }
    out
}

pub fn render_document(doc: &GeneratedDocument) -> String {
    let mut out = String::new();

    let status = if doc.ai_processed {
        format!("✓ {}", doc.ai_engine.as_deref().unwrap_or("ai")).green()
    } else if doc.user_initiated {
        "✗ cancelled, original content kept".yellow()
    } else {
        "✗ generation failed, original content kept".red()
    };
    out.push_str(&format!(
        "{} {}  {}\n",
        format!("[step {}]", doc.step).cyan(),
        doc.title.bold(),
        status
    ));
    if !doc.team.is_empty() {
        out.push_str(&format!("  {} {}\n", "Team:".bold(), doc.team));
    }
    if let Some(error) = &doc.ai_error {
        out.push_str(&format!("  {}\n", error.dimmed()));
    }

    for section in &doc.sections {
        out.push_str(&format!("\n  {}\n", section.title.bold()));
        for line in section.content.lines() {
            out.push_str(&format!("    {}\n", line));
        }
    }

    if !doc.quiz.is_empty() {
        out.push_str(&format!("\n  {}\n", "Quiz".bold()));
        for (index, item) in doc.quiz.iter().enumerate() {
            let question = if item.is_placeholder_item() {
                item.question.dimmed().to_string()
            } else {
                item.question.clone()
            };
            out.push_str(&format!("  {}. {}\n", index + 1, question));
            for (option_index, option) in item.options.iter().enumerate() {
                let marker = if option_index == item.correct_index { "*" } else { " " };
                out.push_str(&format!("     {} {}\n", marker.green(), option));
            }
        }
    }
    out
}

pub fn render_validation(report: &QuizValidationReport) -> String {
    let stats = &report.stats;
    let mut out = format!(
        "\n  {} {} total, {} valid, {} placeholders, {} short, {} duplicates\n",
        "Quiz check:".bold(),
        stats.total,
        stats.valid_count,
        stats.placeholders,
        stats.short_questions,
        stats.duplicates
    );
    for issue in &report.issues {
        out.push_str(&format!("    {} {}\n", "•".yellow(), issue));
    }
    out
}

/// Print a success message
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message);
}
