//! Quiz validation command

use anyhow::{bail, Context, Result};
use ojt_core::{GeneratedDocument, QuizPool, QuizValidationReport};
use ojt_generation::validate_pool;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::cli::Cli;
use crate::output::{self, OutputFormat};

/// One validated pool and where it came from
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PoolReport {
    label: String,
    #[serde(flatten)]
    report: QuizValidationReport,
}

pub fn run(cli: &Cli, file: &Path, min_question_chars: Option<usize>, strict: bool) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let pools = parse_pools(&content)?;

    let min_chars = match min_question_chars {
        Some(min) => min,
        None => super::load_config(cli)?.quiz.min_question_chars,
    };

    let reports: Vec<PoolReport> = pools
        .into_iter()
        .map(|(label, pool)| PoolReport {
            label,
            report: validate_pool(&pool, min_chars),
        })
        .collect();

    let rendered = match cli.format {
        OutputFormat::Text => reports
            .iter()
            .map(|r| format!("{}{}", r.label, output::render_validation(&r.report)))
            .collect::<Vec<_>>()
            .join("\n"),
        format => output::format_output(&reports, format)?,
    };
    output::emit(&rendered, None)?;

    let invalid = reports.iter().filter(|r| !r.report.valid).count();
    if strict && invalid > 0 {
        bail!("{} of {} quiz pool(s) have issues", invalid, reports.len());
    }
    Ok(())
}

/// Accepts a document, a list of documents or a bare quiz array
fn parse_pools(content: &str) -> Result<Vec<(String, QuizPool)>> {
    let value: Value = serde_json::from_str(content).context("File is not valid JSON")?;

    let is_quiz_array = |items: &[Value]| items.iter().all(|item| item.get("question").is_some());

    match value {
        Value::Array(items) if is_quiz_array(&items) => {
            let pool: QuizPool = serde_json::from_value(Value::Array(items))
                .context("Quiz array has malformed items")?;
            Ok(vec![("Quiz".to_string(), pool)])
        }
        Value::Array(items) => items
            .into_iter()
            .map(document_pool)
            .collect(),
        object @ Value::Object(_) => Ok(vec![document_pool(object)?]),
        _ => bail!("Expected a document, a list of documents or a quiz array"),
    }
}

fn document_pool(value: Value) -> Result<(String, QuizPool)> {
    let doc: GeneratedDocument =
        serde_json::from_value(value).context("Not a generated document")?;
    Ok((format!("Step {}: {}", doc.step, doc.title), doc.quiz))
}
