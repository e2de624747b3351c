//! Targeted quiz regeneration

use ojt_core::{QuizItem, QuizPool};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::GenerationRequest;
use crate::generator::AiContentGenerator;

/// Replaces flagged quiz items with freshly generated ones
pub struct QuizRegenerator {
    generator: Arc<AiContentGenerator>,
}

impl QuizRegenerator {
    pub fn new(generator: Arc<AiContentGenerator>) -> Self {
        Self { generator }
    }

    /// Regenerate the items at `targets`.
    ///
    /// New items are spliced into the sorted, in-range targets in order.
    /// Targets left without a new item keep their old one. When generation
    /// falls back the pool comes back unchanged.
    pub async fn regenerate(
        &self,
        source_text: &str,
        title: &str,
        targets: &[usize],
        pool: &[QuizItem],
        cancel: &CancellationToken,
    ) -> QuizPool {
        let targets: Vec<usize> = targets
            .iter()
            .copied()
            .filter(|&index| index < pool.len())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if targets.is_empty() {
            debug!("No regeneration targets in range");
            return pool.to_vec();
        }

        let request =
            GenerationRequest::new(source_text, title).for_regeneration(targets.len());
        let document = self.generator.generate(&request, cancel).await;

        if document.is_fallback() {
            warn!(
                error = document.ai_error.as_deref().unwrap_or_default(),
                "Quiz regeneration failed, keeping existing pool"
            );
            return pool.to_vec();
        }

        let fresh: Vec<QuizItem> = document
            .quiz
            .into_iter()
            .filter(|item| !item.is_placeholder_item())
            .collect();

        let mut regenerated = pool.to_vec();
        let mut replaced = 0;
        for (&index, item) in targets.iter().zip(fresh) {
            regenerated[index] = item;
            replaced += 1;
        }

        info!(
            targets = targets.len(),
            replaced, "Quiz items regenerated"
        );
        regenerated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::Deadline;
    use crate::engine::GenerationEngine;
    use crate::quiz::placeholder_item;
    use crate::{GenerationError, Result};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedEngine {
        reply: Option<String>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerationRequest, _cancel: &CancellationToken) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().ok_or(GenerationError::RateLimit)
        }
    }

    fn regenerator(reply: Option<&str>) -> (QuizRegenerator, Arc<ScriptedEngine>) {
        let engine = Arc::new(ScriptedEngine {
            reply: reply.map(str::to_string),
            requests: Mutex::new(Vec::new()),
        });
        let generator = AiContentGenerator::new(engine.clone(), Deadline::new(Duration::from_secs(5)), 4);
        (QuizRegenerator::new(Arc::new(generator)), engine)
    }

    fn item(question: &str) -> QuizItem {
        QuizItem::new(question, vec!["a".into(), "b".into(), "c".into(), "d".into()], 0)
    }

    fn pool() -> QuizPool {
        vec![
            item("Who signs the permit?"),
            item("Why?"),
            item("Who signs the permit?"),
            placeholder_item("Permits", 4),
        ]
    }

    #[tokio::test]
    async fn test_splices_new_items_into_targets() {
        let reply = r#"{"quiz": [
            {"question": "When does a permit expire?", "options": ["End of shift", "Never", "Weekly", "Monthly"], "correctIndex": 0},
            {"question": "Where are permits posted?", "options": ["At the job", "Office", "Canteen", "Gate"], "correctIndex": 0}
        ]}"#;
        let (regenerator, engine) = regenerator(Some(reply));
        let original = pool();

        let result = regenerator
            .regenerate("Permit rules", "Permits", &[2, 1, 2], &original, &CancellationToken::new())
            .await;

        assert_eq!(result.len(), 4);
        assert_eq!(result[0], original[0]);
        assert_eq!(result[1].question, "When does a permit expire?");
        assert_eq!(result[2].question, "Where are permits posted?");
        assert_eq!(result[3], original[3]);
        assert_eq!(original[1].question, "Why?");

        let requests = engine.requests.lock().unwrap();
        assert!(requests[0].regeneration);
        assert_eq!(requests[0].quiz_size, 2);
        assert_eq!(requests[0].text, "Permit rules");
    }

    #[tokio::test]
    async fn test_short_reply_leaves_remaining_targets() {
        let reply = r#"{"quiz": [{"question": "When does a permit expire?", "options": ["a", "b", "c", "d"]}]}"#;
        let (regenerator, _) = regenerator(Some(reply));
        let original = pool();

        let result = regenerator
            .regenerate("text", "Permits", &[1, 2], &original, &CancellationToken::new())
            .await;

        assert_eq!(result[1].question, "When does a permit expire?");
        assert_eq!(result[2], original[2]);
    }

    #[tokio::test]
    async fn test_failure_returns_pool_unchanged() {
        let (regenerator, _) = regenerator(None);
        let original = pool();

        let result = regenerator
            .regenerate("text", "Permits", &[1, 2], &original, &CancellationToken::new())
            .await;

        assert_eq!(result, original);
    }

    #[tokio::test]
    async fn test_out_of_range_targets_skip_generation() {
        let (regenerator, engine) = regenerator(Some("{}"));
        let original = pool();

        let result = regenerator
            .regenerate("text", "Permits", &[10, 42], &original, &CancellationToken::new())
            .await;

        assert_eq!(result, original);
        assert!(engine.requests.lock().unwrap().is_empty());
    }
}
