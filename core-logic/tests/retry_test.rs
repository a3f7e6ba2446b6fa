use core_logic::{
    classify_failure, classify_message, with_retry, FailureClass, NetworkError, RetryConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("success".to_string())
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_success_after_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count < 3 {
            Err(anyhow::anyhow!("temporary error"))
        } else {
            Ok("success".to_string())
        }
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_fixed_retry_makes_max_plus_one_attempts() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::fixed(2, 5);

    let result: Result<(), anyhow::Error> = with_retry(config, "verify", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("explorer unavailable"))
    })
    .await;

    let err = result.unwrap_err();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert!(format!("{:#}", err).contains("verify failed after 3 attempts"));
}

#[tokio::test]
async fn test_fixed_retry_waits_between_attempts() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::fixed(2, 20);
    let start = std::time::Instant::now();

    let _: Result<(), anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("error"))
    })
    .await;

    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[test]
fn test_classify_node_messages() {
    assert_eq!(
        classify_message("nonce too low: next nonce 12, tx nonce 11"),
        FailureClass::NonceTooLow
    );
    assert_eq!(
        classify_message("Transaction gas price too low"),
        FailureClass::Underpriced
    );
    assert_eq!(
        classify_message("max fee per gas less than block base fee: fee too low"),
        FailureClass::Underpriced
    );
    assert_eq!(
        classify_message("replacement transaction underpriced"),
        FailureClass::Underpriced
    );
    assert_eq!(classify_message("502 Bad Gateway"), FailureClass::TransientNetwork);
    assert_eq!(
        classify_message("getaddrinfo ENOTFOUND rpc.example"),
        FailureClass::TransientNetwork
    );
    assert_eq!(
        classify_message("insufficient funds for gas * price + value"),
        FailureClass::Unclassified
    );
}

#[test]
fn test_structured_errors_win_over_text() {
    let err = anyhow::Error::new(NetworkError::HttpError {
        status_code: 502,
        endpoint: "https://rpc.example".to_string(),
    })
    .context("nonce too low");
    assert_eq!(classify_failure(&err), FailureClass::TransientNetwork);

    let rpc = anyhow::Error::new(NetworkError::Rpc {
        code: -32000,
        message: "nonce too low".to_string(),
    });
    assert_eq!(classify_failure(&rpc), FailureClass::NonceTooLow);

    let timeout = anyhow::Error::new(NetworkError::Timeout {
        timeout_ms: 10_000,
        endpoint: "https://rpc.example".to_string(),
    });
    assert_eq!(classify_failure(&timeout), FailureClass::TransientNetwork);
}

#[test]
fn test_unstructured_errors_fall_back_to_message() {
    let err = anyhow::anyhow!("error sending request: dns error: failed to lookup address");
    assert_eq!(classify_failure(&err), FailureClass::TransientNetwork);

    let err = anyhow::anyhow!("execution reverted");
    assert_eq!(classify_failure(&err), FailureClass::Unclassified);
    assert!(!FailureClass::Unclassified.is_retryable());
}

#[test]
fn test_http_status_other_than_gateway_is_not_retried() {
    let err = NetworkError::HttpError {
        status_code: 401,
        endpoint: "https://rpc.example".to_string(),
    };
    assert_eq!(err.failure_class(), FailureClass::Unclassified);
}
