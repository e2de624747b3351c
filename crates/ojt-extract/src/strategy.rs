//! Ordered fallback strategies
//!
//! A [`StrategyChain`] tries its strategies one after another and returns the
//! first success. Attempts are strictly sequential so a failure can always be
//! attributed to a specific strategy.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{ExtractError, Result};

/// One way of turning an input into an output
#[async_trait]
pub trait Strategy<I: ?Sized + Sync, O: Send>: Send + Sync {
    /// Name reported in logs and in the exhaustion error
    fn name(&self) -> &str;

    async fn attempt(&self, input: &I) -> Result<O>;
}

/// Ordered list of strategies tried until one succeeds
pub struct StrategyChain<I: ?Sized, O> {
    strategies: Vec<Arc<dyn Strategy<I, O>>>,
}

impl<I, O> StrategyChain<I, O>
where
    I: ?Sized + Sync,
    O: Send,
{
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn add(mut self, strategy: Arc<dyn Strategy<I, O>>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain, returning the first output and the name of the strategy
    /// that produced it.
    ///
    /// Input errors end the chain immediately; every other error moves on to
    /// the next strategy.
    pub async fn run(&self, input: &I) -> Result<(O, String)> {
        let mut last: Option<(String, ExtractError)> = None;

        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.attempt(input).await {
                Ok(output) => {
                    debug!(strategy = strategy.name(), attempt = index + 1, "Strategy succeeded");
                    return Ok((output, strategy.name().to_string()));
                }
                Err(e) if e.is_input_error() => return Err(e),
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Strategy failed");
                    last = Some((strategy.name().to_string(), e));
                }
            }
        }

        match last {
            Some((last_strategy, last_error)) => Err(ExtractError::Exhausted {
                attempts: self.strategies.len(),
                last_strategy,
                last_error: Box::new(last_error),
            }),
            None => Err(ExtractError::NoStrategies),
        }
    }
}

impl<I, O> Default for StrategyChain<I, O>
where
    I: ?Sized + Sync,
    O: Send,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        output: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(name: &'static str, output: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                output: Some(output),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                output: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Strategy<str, String> for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn attempt(&self, input: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.output {
                Some(out) => Ok(format!("{}:{}", out, input)),
                None => Err(ExtractError::Relay(format!("{} down", self.name))),
            }
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let first = Fixed::failing("a");
        let second = Fixed::ok("b", "B");
        let third = Fixed::ok("c", "C");
        let chain = StrategyChain::new()
            .add(first.clone())
            .add(second.clone())
            .add(third.clone());

        let (output, name) = chain.run("x").await.unwrap();

        assert_eq!(output, "B:x");
        assert_eq!(name, "b");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_carries_last_error() {
        let chain: StrategyChain<str, String> = StrategyChain::new()
            .add(Fixed::failing("a"))
            .add(Fixed::failing("b"));

        match chain.run("x").await {
            Err(ExtractError::Exhausted {
                attempts,
                last_strategy,
                last_error,
            }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last_strategy, "b");
                assert!(last_error.to_string().contains("b down"));
            }
            other => panic!("unexpected result: {:?}", other.map(|(o, _)| o)),
        }
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain: StrategyChain<str, String> = StrategyChain::default();
        assert!(chain.is_empty());
        assert!(matches!(chain.run("x").await, Err(ExtractError::NoStrategies)));
    }
}
