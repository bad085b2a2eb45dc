//! Two-stage cooperative shutdown.
//!
//! The first stage stops the engine from submitting new tasks while
//! in-flight tasks drain. The second abandons whatever is still running.

use tokio_util::sync::CancellationToken;

/// Cancellation handle shared between the signal handler and the engine.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    stop: CancellationToken,
    abandon: CancellationToken,
}

/// Which stage a request moved the signal into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStage {
    /// No new tasks will be submitted.
    Draining,
    /// In-flight tasks are being abandoned.
    Abandoning,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances to the next stage and returns it.
    ///
    /// First call stops submission, any later call abandons in-flight work.
    pub fn escalate(&self) -> ShutdownStage {
        if self.stop.is_cancelled() {
            self.abandon();
            ShutdownStage::Abandoning
        } else {
            self.request_stop();
            ShutdownStage::Draining
        }
    }

    /// Stops submission of new tasks.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Abandons in-flight tasks. Implies [`Self::request_stop`].
    pub fn abandon(&self) {
        self.stop.cancel();
        self.abandon.cancel();
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandon.is_cancelled()
    }

    /// Resolves once submission should stop.
    pub async fn stopped(&self) {
        self.stop.cancelled().await;
    }

    /// Resolves once in-flight work should be abandoned.
    pub async fn abandoned(&self) {
        self.abandon.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalate_moves_through_stages() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_stop_requested());

        assert_eq!(signal.escalate(), ShutdownStage::Draining);
        assert!(signal.is_stop_requested());
        assert!(!signal.is_abandoned());

        assert_eq!(signal.escalate(), ShutdownStage::Abandoning);
        assert!(signal.is_abandoned());
    }

    #[test]
    fn test_abandon_implies_stop() {
        let signal = ShutdownSignal::new();
        signal.abandon();
        assert!(signal.is_stop_requested());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let signal = ShutdownSignal::new();
        let handler = signal.clone();
        handler.request_stop();
        signal.stopped().await;
        assert!(signal.is_stop_requested());
    }
}
