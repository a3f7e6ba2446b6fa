//! Builds, signs, submits and confirms one transaction, retrying the
//! failure classes that have a known remedy.

use crate::client::ChainClient;
use anyhow::{anyhow, Result};
use core_logic::config::SubmitConfig;
use core_logic::{classify_failure, FailureClass, GasConfig, SubmitError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, TxHash, U256, U64};
use tokio::time::sleep;
use tracing::{info, warn};

/// What a transaction does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Plain native-currency transfer.
    Native { to: Address, value: U256 },
    /// Contract call, optionally carrying value.
    Call { to: Address, data: Bytes, value: U256 },
    /// Contract creation; `bytecode` includes encoded constructor args.
    Create { bytecode: Bytes },
}

impl Payload {
    fn request(&self) -> TransactionRequest {
        match self {
            Payload::Native { to, value } => TransactionRequest::new().to(*to).value(*value),
            Payload::Call { to, data, value } => TransactionRequest::new()
                .to(*to)
                .data(data.clone())
                .value(*value),
            Payload::Create { bytecode } => TransactionRequest::new().data(bytecode.clone()),
        }
    }
}

enum AttemptError {
    /// Failed before the node accepted the transaction; may be retried.
    Submit(anyhow::Error),
    /// Accepted but not confirmed successfully; never retried.
    Terminal(SubmitError),
}

#[derive(Debug, Clone, Default)]
pub struct Submitter {
    config: SubmitConfig,
    gas: GasConfig,
}

impl Submitter {
    pub fn new(config: SubmitConfig, gas: GasConfig) -> Self {
        Self { config, gas }
    }

    /// Submits `payload` and waits for one confirmation.
    ///
    /// `gas_price` overrides the configured or network price for the first
    /// attempt. Errors are [`SubmitError`]s.
    pub async fn submit<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        payload: &Payload,
        gas_price: Option<U256>,
    ) -> Result<TransactionReceipt> {
        let max_attempts = self.config.max_retries.max(1);
        let mut gas_price = gas_price.or_else(|| self.gas.price_override_wei().map(U256::from));
        let mut attempts = 0;

        loop {
            attempts += 1;
            let err = match self.attempt(client, payload, &mut gas_price).await {
                Ok(receipt) => return Ok(receipt),
                Err(AttemptError::Terminal(e)) => return Err(e.into()),
                Err(AttemptError::Submit(e)) => e,
            };

            let class = classify_failure(&err);
            if !class.is_retryable() {
                return Err(SubmitError::Rejected {
                    reason: format!("{:#}", err),
                }
                .into());
            }

            if attempts >= max_attempts {
                warn!("Transaction failed after {} attempts: {:#}", attempts, err);
                return Err(SubmitError::Exhausted {
                    attempts,
                    last_error: format!("{:#}", err),
                }
                .into());
            }

            match class {
                FailureClass::NonceTooLow => {
                    warn!("🔄 Nonce is too low, fetching the latest nonce...");
                    sleep(self.config.nonce_backoff()).await;
                }
                FailureClass::Underpriced => {
                    warn!("📈 Fee is too low, increasing gas price...");
                    gas_price = match client.gas_price().await {
                        Ok(current) => Some(self.bump(current)),
                        Err(e) => {
                            warn!("Could not refresh gas price ({:#}), bumping the last one", e);
                            gas_price.map(|p| self.bump(p))
                        }
                    };
                }
                FailureClass::TransientNetwork => {
                    warn!(
                        "⚠️ Transaction failed due to server/DNS error. Retrying ({}/{})...",
                        attempts, max_attempts
                    );
                    client.reselect().await;
                    sleep(self.config.network_backoff()).await;
                }
                FailureClass::Unclassified => unreachable!("handled above"),
            }
        }
    }

    fn bump(&self, price: U256) -> U256 {
        U256::from(self.gas.bumped(price.low_u128()))
    }

    async fn attempt<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        payload: &Payload,
        gas_price: &mut Option<U256>,
    ) -> Result<TransactionReceipt, AttemptError> {
        let hash = self
            .send_once(client, payload, gas_price)
            .await
            .map_err(AttemptError::Submit)?;

        info!("💸 Tx Hash: {:?}", hash);
        if let Some(link) = client.chain().tx_url(&format!("{:?}", hash)) {
            info!("🔎 Explorer: {}", link);
        }
        info!("⏳ Waiting for transaction confirmation...");

        self.confirm(client, hash).await.map_err(AttemptError::Terminal)
    }

    async fn send_once<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        payload: &Payload,
        gas_price: &mut Option<U256>,
    ) -> Result<TxHash> {
        let nonce = client.pending_nonce().await?;
        let price = match *gas_price {
            Some(p) => p,
            None => {
                let p = client.gas_price().await?;
                *gas_price = Some(p);
                p
            }
        };

        let tx: TypedTransaction = payload
            .request()
            .from(client.address())
            .nonce(nonce)
            .gas_price(price)
            .chain_id(client.chain().chain_id)
            .into();

        client.send(tx).await
    }

    async fn confirm<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        hash: TxHash,
    ) -> Result<TransactionReceipt, SubmitError> {
        let tx_hash = format!("{:?}", hash);

        let waited = match self.config.confirmation_timeout() {
            Some(limit) => tokio::time::timeout(limit, client.wait_for_receipt(hash))
                .await
                .map_err(|_| SubmitError::ConfirmationTimeout {
                    tx_hash: tx_hash.clone(),
                    timeout_secs: limit.as_secs(),
                })?,
            None => client.wait_for_receipt(hash).await,
        };

        let receipt = waited
            .map_err(|e| {
                warn!("Lost track of {} while waiting: {:#}", tx_hash, e);
                SubmitError::Dropped {
                    tx_hash: tx_hash.clone(),
                }
            })?
            .ok_or_else(|| SubmitError::Dropped {
                tx_hash: tx_hash.clone(),
            })?;

        if receipt.status == Some(U64::zero()) {
            return Err(SubmitError::Reverted { tx_hash });
        }
        Ok(receipt)
    }
}

/// Convenience for callers that only need the hash of a confirmed receipt.
pub fn receipt_hash(receipt: &TransactionReceipt) -> String {
    format!("{:?}", receipt.transaction_hash)
}

/// Contract address of a creation receipt.
pub fn created_address(receipt: &TransactionReceipt) -> Result<Address> {
    receipt
        .contract_address
        .ok_or_else(|| anyhow!("No contract address in receipt {:?}", receipt.transaction_hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_has_no_recipient() {
        let payload = Payload::Create {
            bytecode: Bytes::from(vec![0x60, 0x80]),
        };
        assert!(payload.request().to.is_none());
    }

    #[test]
    fn test_bump_applies_percent() {
        let submitter = Submitter::default();
        assert_eq!(submitter.bump(U256::from(100u64)), U256::from(120u64));
    }
}
