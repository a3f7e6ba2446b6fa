//! # Core Logic - Pacing Utilities
//!
//! Randomized pauses between consecutive transactions so a batch does not
//! hit the node at a fixed cadence.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Uniform random delay in `[min, max]` whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    min_secs: u64,
    max_secs: u64,
}

impl DelayWindow {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs: min_secs.min(max_secs),
            max_secs: min_secs.max(max_secs),
        }
    }

    /// No pause at all.
    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.max_secs == 0
    }

    pub fn sample(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.min_secs..=self.max_secs);
        Duration::from_secs(secs)
    }

    /// Sleeps for a sampled duration. Returns `false` if cancelled first.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.is_zero() {
            return !cancel.is_cancelled();
        }

        let delay = self.sample();
        debug!("Waiting {}s before next transaction", delay.as_secs());

        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_bounds() {
        let window = DelayWindow::new(10, 60);
        for _ in 0..200 {
            let d = window.sample().as_secs();
            assert!((10..=60).contains(&d));
        }
    }

    #[test]
    fn test_bounds_are_ordered() {
        assert_eq!(DelayWindow::new(60, 10), DelayWindow::new(10, 60));
    }

    #[tokio::test]
    async fn test_pause_respects_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(!DelayWindow::new(30, 30).pause(&token).await);
        assert!(!DelayWindow::zero().pause(&token).await);
    }

    #[tokio::test]
    async fn test_zero_window_returns_immediately() {
        let token = CancellationToken::new();
        assert!(DelayWindow::zero().pause(&token).await);
    }
}
