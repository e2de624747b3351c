//! Generation deadline
//!
//! Races an operation against a timeout and a cancellation token. Whichever
//! fires first wins and the operation's future is dropped, so an abandoned
//! model call never holds up the caller.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{GenerationError, Result};

/// Timeout applied to every generation call
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    timeout: Duration,
}

impl Deadline {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `operation` until it finishes, the timeout elapses or `cancel`
    /// fires. Cancellation is checked first.
    pub async fn run<F, T>(&self, operation_name: &str, cancel: &CancellationToken, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(operation = operation_name, "Operation cancelled");
                Err(GenerationError::Cancelled)
            }
            outcome = tokio::time::timeout(self.timeout, operation) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        operation = operation_name,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Operation timed out"
                    );
                    Err(GenerationError::Timeout(self.timeout))
                }
            },
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_completes_in_time() {
        let deadline = Deadline::new(Duration::from_secs(1));
        let result = deadline
            .run("quick", &CancellationToken::new(), async { Ok(42) })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_times_out() {
        let deadline = Deadline::new(Duration::from_millis(20));
        let result: Result<()> = deadline
            .run("slow", &CancellationToken::new(), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(GenerationError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_cancel_abandons_operation() {
        let deadline = Deadline::new(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let finished = Arc::new(AtomicBool::new(false));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let flag = finished.clone();
        let started = std::time::Instant::now();
        let result: Result<()> = deadline
            .run("model call", &cancel, async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(GenerationError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = Deadline::default().run("x", &cancel, async { Ok(1) }).await;
        assert!(matches!(result, Err(GenerationError::Cancelled)));
    }
}
