//! Generation engine contract

use async_trait::async_trait;
use ojt_core::{EngineKind, GenerationConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cloud::CloudEngine;
use crate::local::LocalEngine;
use crate::Result;

/// Everything an engine needs to produce one step's document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Source text of this step
    pub text: String,
    pub title: String,
    pub team: String,
    /// 1-based
    pub step: usize,
    pub total_steps: usize,
    /// Number of quiz questions to ask the model for
    pub quiz_size: usize,
    /// Ask only for fresh quiz questions
    #[serde(default)]
    pub regeneration: bool,
}

impl GenerationRequest {
    pub fn new(text: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: title.into(),
            team: String::new(),
            step: 1,
            total_steps: 1,
            quiz_size: 20,
            regeneration: false,
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    pub fn with_step(mut self, step: usize, total_steps: usize) -> Self {
        self.step = step.max(1);
        self.total_steps = total_steps.max(self.step);
        self
    }

    pub fn with_quiz_size(mut self, size: usize) -> Self {
        self.quiz_size = size;
        self
    }

    /// Turn this into a request for `count` replacement questions
    pub fn for_regeneration(mut self, count: usize) -> Self {
        self.regeneration = true;
        self.quiz_size = count.max(1);
        self
    }
}

/// A language model that answers a prompt with raw text.
///
/// Implementations should stop work when `cancel` fires; the generator drops
/// the call either way.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Name recorded as `aiEngine` on generated documents
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest, cancel: &CancellationToken) -> Result<String>;
}

/// Build the engine selected by `config.engine`
pub fn engine_from_config(config: &GenerationConfig) -> Result<Arc<dyn GenerationEngine>> {
    let engine: Arc<dyn GenerationEngine> = match config.engine {
        EngineKind::Cloud => Arc::new(CloudEngine::from_config(config)?),
        EngineKind::Local => Arc::new(LocalEngine::from_config(config)?),
    };
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = GenerationRequest::new("text", "Title")
            .with_team("Logistics")
            .with_step(2, 3)
            .with_quiz_size(10);

        assert_eq!(request.team, "Logistics");
        assert_eq!(request.step, 2);
        assert_eq!(request.total_steps, 3);
        assert_eq!(request.quiz_size, 10);
        assert!(!request.regeneration);

        let regen = request.for_regeneration(3);
        assert!(regen.regeneration);
        assert_eq!(regen.quiz_size, 3);
    }

    #[test]
    fn test_engine_selection() {
        let cloud = engine_from_config(&GenerationConfig::default()).unwrap();
        assert_eq!(cloud.name(), "cloud:gemini-1.5-flash");

        let local = engine_from_config(
            &GenerationConfig::default()
                .with_engine(EngineKind::Local)
                .with_model("llama3"),
        )
        .unwrap();
        assert_eq!(local.name(), "local:llama3");
    }
}
