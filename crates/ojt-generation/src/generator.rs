//! AI content generator
//!
//! Drives one generation through `Idle -> Generating -> Succeeded` or
//! `FallbackSucceeded`. Every failure, including timeout and user
//! cancellation, ends in a fallback document holding the escaped source text,
//! so callers always receive a usable document.

use chrono::Utc;
use ojt_core::{
    silent, GeneratedDocument, GenerationConfig, QuizConfig, Section, SharedProgress,
    FALLBACK_SECTION_TITLE,
};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::deadline::Deadline;
use crate::engine::{GenerationEngine, GenerationRequest};
use crate::json_repair::parse_model_json;
use crate::quiz::{fill_placeholders, normalize_pool};
use crate::sanitize::{escape_text, paragraphs_html, sanitize_html};
use crate::GenerationError;

const DEFAULT_SECTION_TITLE: &str = "Learning goals";

/// Lifecycle of one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    /// Source text is being extracted (reported by the ingestor)
    Extracting,
    Generating,
    Succeeded,
    FallbackSucceeded,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::Extracting => "extracting",
            GenerationState::Generating => "generating",
            GenerationState::Succeeded => "succeeded",
            GenerationState::FallbackSucceeded => "fallback-succeeded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationState::Succeeded | GenerationState::FallbackSucceeded
        )
    }

    pub fn can_transition_to(&self, next: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, next),
            (Idle, Extracting)
                | (Idle, Generating)
                | (Extracting, Generating)
                | (Generating, Succeeded)
                | (Generating, FallbackSucceeded)
        )
    }
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates OJT documents through a pluggable engine
pub struct AiContentGenerator {
    engine: Arc<dyn GenerationEngine>,
    deadline: Deadline,
    pool_size: usize,
    progress: SharedProgress,
}

impl AiContentGenerator {
    pub fn new(engine: Arc<dyn GenerationEngine>, deadline: Deadline, pool_size: usize) -> Self {
        Self {
            engine,
            deadline,
            pool_size,
            progress: silent(),
        }
    }

    pub fn from_config(
        engine: Arc<dyn GenerationEngine>,
        generation: &GenerationConfig,
        quiz: &QuizConfig,
    ) -> Self {
        Self::new(engine, Deadline::new(generation.timeout()), quiz.pool_size)
    }

    pub fn with_progress(mut self, progress: SharedProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Generate a document for `request`. Never fails.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> GeneratedDocument {
        self.generate_with_state(request, cancel).await.0
    }

    /// Like [`generate`](Self::generate), also returning the terminal state
    #[instrument(skip(self, request, cancel), fields(engine = %self.engine.name(), step = request.step))]
    pub async fn generate_with_state(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> (GeneratedDocument, GenerationState) {
        let mut state = GenerationState::Idle;
        self.transition(&mut state, GenerationState::Generating, request);

        let outcome = self
            .deadline
            .run("generation", cancel, self.engine.generate(request, cancel))
            .await
            .and_then(|raw| parse_model_json(&raw));

        match outcome {
            Ok(value) => {
                let document = self.build_document(value, request);
                self.transition(&mut state, GenerationState::Succeeded, request);
                (document, state)
            }
            Err(error) => {
                warn!(error = %error, "Generation failed, using original content");
                let document = fallback_document(request, &error);
                self.transition(&mut state, GenerationState::FallbackSucceeded, request);
                (document, state)
            }
        }
    }

    fn transition(&self, state: &mut GenerationState, next: GenerationState, request: &GenerationRequest) {
        debug_assert!(state.can_transition_to(next), "{} -> {}", state, next);
        debug!(from = %state, to = %next, "Generation state changed");
        *state = next;

        let status = match next {
            GenerationState::Generating if request.total_steps > 1 => format!(
                "Generating step {}/{}: {}",
                request.step, request.total_steps, request.title
            ),
            GenerationState::Generating => format!("Generating: {}", request.title),
            GenerationState::Succeeded => format!("Generated step {}", request.step),
            GenerationState::FallbackSucceeded => {
                format!("Step {} kept as original content", request.step)
            }
            other => other.to_string(),
        };
        self.progress.on_progress(&status);
    }

    fn build_document(&self, value: Value, request: &GenerationRequest) -> GeneratedDocument {
        let title = value
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| request.title.clone());

        let mut sections = parse_sections(&value);
        if sections.is_empty() {
            sections.push(default_section(&title));
        }

        let raw_quiz = value
            .get("quiz")
            .or_else(|| value.get("questions"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let quiz = fill_placeholders(normalize_pool(&raw_quiz, &title), self.pool_size, &title);

        info!(
            sections = sections.len(),
            quiz = quiz.len(),
            generated = raw_quiz.len(),
            "Document generated"
        );

        GeneratedDocument {
            title,
            team: request.team.clone(),
            sections,
            quiz,
            step: request.step,
            ai_processed: true,
            ai_engine: Some(self.engine.name().to_string()),
            ai_error: None,
            user_initiated: false,
            generated_at: Utc::now(),
        }
    }
}

fn parse_sections(value: &Value) -> Vec<Section> {
    let Some(raw) = value.get("sections").and_then(Value::as_array) else {
        return Vec::new();
    };

    raw.iter()
        .enumerate()
        .filter_map(|(index, section)| {
            let title = section
                .get("title")
                .or_else(|| section.get("heading"))
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();

            let content = match section.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Array(parts)) => parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => String::new(),
            };
            let content = sanitize_html(&content);

            if title.is_empty() && content.trim().is_empty() {
                return None;
            }

            let title = if title.is_empty() {
                format!("Section {}", index + 1)
            } else {
                title.to_string()
            };
            Some(Section::new(title, content))
        })
        .collect()
}

fn default_section(title: &str) -> Section {
    Section::new(
        DEFAULT_SECTION_TITLE,
        format!(
            "<ul><li>Understand the key points of {}</li><li>Apply them on the job</li></ul>",
            escape_text(title)
        ),
    )
}

/// The document produced when generation fails
pub fn fallback_document(request: &GenerationRequest, error: &GenerationError) -> GeneratedDocument {
    GeneratedDocument {
        title: request.title.clone(),
        team: request.team.clone(),
        sections: vec![Section::new(
            FALLBACK_SECTION_TITLE,
            paragraphs_html(&request.text),
        )],
        quiz: Vec::new(),
        step: request.step,
        ai_processed: false,
        ai_engine: None,
        ai_error: Some(error.to_string()),
        user_initiated: error.is_cancellation(),
        generated_at: Utc::now(),
    }
}
