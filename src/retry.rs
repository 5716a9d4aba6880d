use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Bounded polling: at most `max_attempts` queries with a fixed pause
/// between consecutive queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Total wall time the policy may spend sleeping.
    pub fn budget(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }

    /// Sleeps for the configured delay unless `cancel` fires first.
    /// Returns `false` when cancelled.
    pub async fn pause(&self, cancel: &CancelToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(10))
    }
}

/// Cloneable cancellation signal shared between the caller and the
/// polling/download loops.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
