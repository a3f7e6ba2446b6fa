use crate::error::NetworkError;
use anyhow::{Context, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: base_delay_ms * 30,
            ..Default::default()
        }
    }

    /// Constant delay between attempts, no jitter.
    pub fn fixed(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            exponential_base: 1.0,
            jitter: false,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            let rng_factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * rng_factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

pub async fn with_retry<T, F, Fut>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt + 1);
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt >= config.max_retries {
                    let error_msg = format!("{}", e);
                    return Err(e).context(format!(
                        "{} failed after {} attempts. Last error: {}",
                        operation_name,
                        attempt + 1,
                        error_msg
                    ));
                }

                let delay = config.calculate_delay(attempt);
                debug!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    operation_name,
                    attempt + 1,
                    config.max_retries + 1,
                    delay,
                    e
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// How a failed submission should be remediated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Nonce already used; wait and re-fetch the pending nonce.
    NonceTooLow,
    /// Fee below the node's floor; bump the gas price.
    Underpriced,
    /// Gateway, DNS or connection trouble; wait and try again.
    TransientNetwork,
    /// Never retried.
    Unclassified,
}

impl FailureClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureClass::Unclassified)
    }
}

impl NetworkError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            NetworkError::Timeout { .. } | NetworkError::ConnectionRefused { .. } => {
                FailureClass::TransientNetwork
            }
            NetworkError::HttpError { status_code, .. } => match status_code {
                502 | 504 => FailureClass::TransientNetwork,
                _ => FailureClass::Unclassified,
            },
            NetworkError::Rpc { message, .. } => classify_message(message),
            NetworkError::NoEligibleEndpoint { .. } => FailureClass::TransientNetwork,
            NetworkError::InvalidResponse { .. } => FailureClass::Unclassified,
        }
    }
}

/// Classifies an error, preferring a typed [`NetworkError`] anywhere in the
/// chain and falling back to the rendered message.
pub fn classify_failure(error: &anyhow::Error) -> FailureClass {
    for cause in error.chain() {
        if let Some(net) = cause.downcast_ref::<NetworkError>() {
            return net.failure_class();
        }
    }
    classify_message(&format!("{:#}", error))
}

/// Substring fallback over node and transport error wording.
pub fn classify_message(message: &str) -> FailureClass {
    let msg = message.to_lowercase();

    if msg.contains("nonce") && msg.contains("too low") {
        return FailureClass::NonceTooLow;
    }

    if ((msg.contains("fee") || msg.contains("gas")) && msg.contains("too low"))
        || msg.contains("underpriced")
    {
        return FailureClass::Underpriced;
    }

    let transient_patterns = [
        "502",
        "504",
        "gateway",
        "enotfound",
        "dns error",
        "failed to lookup address",
        "connection refused",
        "connection reset",
        "error sending request",
        "timed out",
    ];

    if transient_patterns.iter().any(|p| msg.contains(p)) {
        return FailureClass::TransientNetwork;
    }

    FailureClass::Unclassified
}
