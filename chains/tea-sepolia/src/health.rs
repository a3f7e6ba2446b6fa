use crate::client::ChainClient;
use anyhow::{Context, Result};
use core_logic::config::HealthConfig;
use ethers::types::U256;
use ethers::utils::parse_ether;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Blocks sends until the chain is producing blocks and the signer can pay.
#[derive(Debug, Clone)]
pub struct HealthGate {
    config: HealthConfig,
    min_balance: U256,
}

impl HealthGate {
    pub fn new(config: HealthConfig) -> Result<Self> {
        let min_balance = parse_ether(config.min_balance_ether)
            .context("Invalid health.min_balance_ether")?;
        Ok(Self {
            config,
            min_balance,
        })
    }

    /// One health probe. Any error counts as unhealthy.
    pub async fn check<C: ChainClient + ?Sized>(&self, client: &C) -> bool {
        match self.probe(client).await {
            Ok(healthy) => healthy,
            Err(e) => {
                error!("🚨 Error monitoring network: {:#}", e);
                false
            }
        }
    }

    async fn probe<C: ChainClient + ?Sized>(&self, client: &C) -> Result<bool> {
        let age = client.head_age().await?;
        if age > self.config.max_head_age() {
            warn!(
                "⚡ Blockchain is not updating quickly (head is {}s old).",
                age.as_secs()
            );
            return Ok(false);
        }

        let balance = client.balance(client.address()).await?;
        if balance < self.min_balance {
            warn!("💰 Wallet balance is insufficient.");
            return Ok(false);
        }

        Ok(true)
    }

    /// Polls until healthy. Returns `false` if cancelled or if the
    /// configured poll cap is reached first.
    pub async fn wait_healthy<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        cancel: &CancellationToken,
    ) -> bool {
        let mut polls: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if self.check(client).await {
                return true;
            }

            polls += 1;
            if self.config.max_polls.is_some_and(|cap| polls >= cap) {
                warn!("Network still unhealthy after {} checks, giving up", polls);
                return false;
            }

            warn!(
                "⏳ RPC/network conditions are not normal, waiting {} seconds...",
                self.config.poll_interval_secs
            );
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = sleep(self.config.poll_interval()) => {}
            }
        }
    }
}
