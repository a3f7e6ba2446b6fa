mod common;

use common::{addr, fast_submitter, gate, MockClient};
use core_logic::{DelayWindow, QuotaLedger};
use ethers::types::U256;
use std::time::Duration;
use tea_project::client::ChainClient;
use tea_project::spammer::{BatchRunner, PayloadPlan};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_fresh_head_and_funded_wallet_is_healthy() {
    let client = MockClient::new();
    assert!(gate(Some(1)).check(&client).await);
}

#[tokio::test]
async fn test_stale_head_is_unhealthy() {
    let client = MockClient::new();
    *client.head_age.lock().unwrap() = Duration::from_secs(45);
    assert!(!gate(Some(1)).check(&client).await);
}

#[tokio::test]
async fn test_low_balance_is_unhealthy() {
    let client = MockClient::new();
    client.set_balance(client.address(), U256::from(1u64));
    assert!(!gate(Some(1)).check(&client).await);
}

#[tokio::test]
async fn test_wait_gives_up_after_poll_cap() {
    let client = MockClient::new();
    *client.head_age.lock().unwrap() = Duration::from_secs(45);
    let cancel = CancellationToken::new();
    assert!(!gate(Some(3)).wait_healthy(&client, &cancel).await);
}

#[tokio::test]
async fn test_stale_head_blocks_submission() {
    let dir = tempfile::tempdir().unwrap();
    let client = MockClient::new();
    *client.head_age.lock().unwrap() = Duration::from_secs(45);
    let submitter = fast_submitter();
    let gate = gate(Some(3));
    let mut ledger = QuotaLedger::open(dir.path(), 10);

    let stats = BatchRunner::new(
        &client,
        &mut ledger,
        &submitter,
        &gate,
        CancellationToken::new(),
    )
    .with_delay(DelayWindow::zero())
    .run_batch(&[addr(1), addr(2)], &PayloadPlan::NativeFixed(U256::exp10(15)))
    .await
    .unwrap();

    assert_eq!(stats.attempted, 0);
    assert_eq!(client.send_count(), 0);
    assert_eq!(ledger.remaining_quota(), 10);
}

#[tokio::test]
async fn test_batch_resumes_once_head_is_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let client = MockClient::new();
    client.script_head_ages(&[Duration::from_secs(45)]);
    let submitter = fast_submitter();
    let gate = gate(Some(5));
    let mut ledger = QuotaLedger::open(dir.path(), 10);

    let stats = BatchRunner::new(
        &client,
        &mut ledger,
        &submitter,
        &gate,
        CancellationToken::new(),
    )
    .with_delay(DelayWindow::zero())
    .run_batch(&[addr(1)], &PayloadPlan::NativeFixed(U256::exp10(15)))
    .await
    .unwrap();

    assert_eq!(stats.attempted, 1);
    assert_eq!(stats.confirmed, 1);
    assert_eq!(client.send_count(), 1);
    assert_eq!(ledger.remaining_quota(), 9);
}
