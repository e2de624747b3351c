//! Progress reporting.
//!
//! Observers receive human-readable status lines. They are never consulted
//! for control flow, so every pipeline entry point works with
//! [`SilentProgress`].

use std::sync::Arc;

/// Receives status updates from long-running pipeline stages.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, status: &str);
}

/// Observer that drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {
    fn on_progress(&self, _status: &str) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_progress(&self, status: &str) {
        self(status)
    }
}

/// Shared observer handle passed between stages.
pub type SharedProgress = Arc<dyn ProgressObserver>;

pub fn silent() -> SharedProgress {
    Arc::new(SilentProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: SharedProgress = Arc::new(move |status: &str| {
            sink.lock().unwrap().push(status.to_string());
        });

        observer.on_progress("extracting");
        observer.on_progress("generating");

        assert_eq!(*seen.lock().unwrap(), vec!["extracting", "generating"]);
    }

    #[test]
    fn test_silent_observer() {
        silent().on_progress("ignored");
    }
}
