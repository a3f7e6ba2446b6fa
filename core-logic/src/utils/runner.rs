use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels a token on Ctrl+C for as long as it is alive.
pub struct ShutdownGuard {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl ShutdownGuard {
    /// Spawns the signal listener. Must be called inside a tokio runtime.
    pub fn install() -> Self {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        let listener = tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. Stopping after the current step...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        Self { token, listener }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_hands_out_live_token() {
        let guard = ShutdownGuard::install();
        let token = guard.token();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(!token.is_cancelled());
    }
}
