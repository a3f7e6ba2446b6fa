//! Batch transfers to a recipient list under the daily quota.

use crate::client::ChainClient;
use crate::contracts::{send_native_calldata, transfer_calldata};
use crate::health::HealthGate;
use crate::submitter::{receipt_hash, Payload, Submitter};
use anyhow::{Context, Result};
use core_logic::{BatchStats, DelayWindow, GeneratedWallet, GeneratedWalletStore, QuotaLedger};
use ethers::prelude::*;
use ethers::utils::{format_ether, hex, parse_ether, to_checksum};
use rand::rngs::OsRng;
use rand::Rng;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How each recipient's transaction is built.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadPlan {
    /// Random native amount in `[min, max]`, rounded to 4 decimals.
    NativeRandom { min: f64, max: f64 },
    /// The same native amount for everyone.
    NativeFixed(U256),
    /// ERC20 `transfer` of `amount` smallest units.
    Token { token: Address, amount: U256 },
}

/// Random native amount in `[min, max]` rounded to 4 decimal places.
pub fn random_native_amount(min: f64, max: f64) -> Result<U256> {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let value = rand::thread_rng().gen_range(lo..=hi);
    parse_ether(format!("{:.4}", value)).context("Invalid native amount")
}

pub struct BatchRunner<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    ledger: &'a mut QuotaLedger,
    submitter: &'a Submitter,
    gate: &'a HealthGate,
    delay: DelayWindow,
    /// Token contract that can pay native transfers out of its own balance.
    native_via: Option<Address>,
    cancel: CancellationToken,
}

impl<'a, C: ChainClient + ?Sized> BatchRunner<'a, C> {
    pub fn new(
        client: &'a C,
        ledger: &'a mut QuotaLedger,
        submitter: &'a Submitter,
        gate: &'a HealthGate,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            ledger,
            submitter,
            gate,
            delay: DelayWindow::new(10, 60),
            native_via: None,
            cancel,
        }
    }

    pub fn with_delay(mut self, delay: DelayWindow) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_native_via(mut self, contract: Option<Address>) -> Self {
        self.native_via = contract;
        self
    }

    /// Recipients still eligible today, in order, without repeats.
    pub fn plan_targets(&mut self, recipients: &[Address]) -> Vec<Address> {
        let mut seen = HashSet::new();
        let pending: Vec<Address> = recipients
            .iter()
            .copied()
            .filter(|a| seen.insert(*a))
            .filter(|a| !self.ledger.is_processed(&ledger_key(a)))
            .collect();

        let quota = self.ledger.remaining_quota();
        let take = pending.len().min(usize::try_from(quota).unwrap_or(usize::MAX));
        pending.into_iter().take(take).collect()
    }

    pub async fn run_batch(
        &mut self,
        recipients: &[Address],
        plan: &PayloadPlan,
    ) -> Result<BatchStats> {
        let mut stats = BatchStats::default();

        if self.ledger.remaining_quota() == 0 {
            error!(
                "Daily limit of {} transactions reached. Please try again tomorrow.",
                self.ledger.limit()
            );
            return Ok(stats);
        }

        let targets = self.plan_targets(recipients);
        if targets.is_empty() {
            info!("All addresses have been processed for today. Processing will continue tomorrow.");
            return Ok(stats);
        }

        info!("💸 Starting to send {} transactions...", targets.len());
        let total = targets.len();

        for (i, recipient) in targets.iter().enumerate() {
            if !self.gate.wait_healthy(self.client, &self.cancel).await {
                warn!("Stopping batch before transaction {}", i + 1);
                break;
            }

            stats.attempted += 1;
            match self.send_one(i + 1, *recipient, plan).await {
                Ok(hash) => {
                    info!(target: "success", "💸 Transfer successful: {}", hash);
                    stats.confirmed += 1;
                    self.ledger
                        .record_sent(&ledger_key(recipient))
                        .context("Failed to persist daily ledger")?;
                }
                Err(e) => error!("❌ Transfer to {:?} failed: {:#}", recipient, e),
            }

            if i + 1 < total && !self.delay.pause(&self.cancel).await {
                warn!("Batch cancelled");
                break;
            }
        }

        info!(
            target: "success",
            "Completed {} out of {} transactions ({} failed).",
            stats.confirmed,
            total,
            stats.failed()
        );
        Ok(stats)
    }

    async fn send_one(&self, n: usize, recipient: Address, plan: &PayloadPlan) -> Result<String> {
        let payload = match plan {
            PayloadPlan::NativeRandom { min, max } => {
                let amount = random_native_amount(*min, *max)?;
                self.native_payload(n, recipient, amount).await?
            }
            PayloadPlan::NativeFixed(amount) => self.native_payload(n, recipient, *amount).await?,
            PayloadPlan::Token { token, amount } => {
                info!("🪙 Transaction {}: Sending tokens to {:?}...", n, recipient);
                Payload::Call {
                    to: *token,
                    data: transfer_calldata(recipient, *amount),
                    value: U256::zero(),
                }
            }
        };

        let receipt = self.submitter.submit(self.client, &payload, None).await?;
        Ok(receipt_hash(&receipt))
    }

    async fn native_payload(&self, n: usize, recipient: Address, amount: U256) -> Result<Payload> {
        info!(
            "💸 Transaction {}: Sending {} TEA to {:?}...",
            n,
            format_ether(amount),
            recipient
        );

        if let Some(contract) = self.native_via {
            let contract_balance = self.client.balance(contract).await?;
            if contract_balance >= amount {
                return Ok(Payload::Call {
                    to: contract,
                    data: send_native_calldata(recipient, amount),
                    value: U256::zero(),
                });
            }
            warn!("⚠️ Contract native balance insufficient. Using main wallet...");
        }

        Ok(Payload::Native {
            to: recipient,
            value: amount,
        })
    }
}

/// Ledger key for an address: lower-case `0x` hex.
pub fn ledger_key(address: &Address) -> String {
    format!("{:?}", address)
}

/// Creates `count` fresh recipient wallets, persisting them before use.
/// Keys whose address is already in the store are discarded.
pub fn generate_recipients(store: &mut GeneratedWalletStore, count: usize) -> Result<Vec<Address>> {
    let mut addresses = Vec::with_capacity(count);
    let mut records = Vec::with_capacity(count);

    while addresses.len() < count {
        let wallet = LocalWallet::new(&mut OsRng);
        let address = wallet.address();
        let checksummed = to_checksum(&address, None);
        if store.contains(&checksummed) || addresses.contains(&address) {
            continue;
        }

        records.push(GeneratedWallet {
            address: checksummed,
            private_key: format!("0x{}", hex::encode(wallet.signer().to_bytes())),
        });
        addresses.push(address);
    }

    store
        .append(&records)
        .context("Failed to save generated wallets")?;
    info!("🆕 Generated {} new wallets", addresses.len());
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_amount_is_in_range() {
        let min = parse_ether("0.001").unwrap();
        let max = parse_ether("0.01").unwrap();
        for _ in 0..100 {
            let amount = random_native_amount(0.001, 0.01).unwrap();
            assert!(amount >= min && amount <= max);
            // 4 decimal places
            assert_eq!(amount % U256::exp10(14), U256::zero());
        }
    }

    #[test]
    fn test_generated_recipients_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = GeneratedWalletStore::open(dir.path()).unwrap();
        let addresses = generate_recipients(&mut store, 3).unwrap();

        assert_eq!(addresses.len(), 3);
        let reopened = GeneratedWalletStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 3);
        assert!(reopened.contains(&ledger_key(&addresses[0])));
    }
}
