//! Signing account bound to the currently selected endpoint.

use crate::utils::rpc_manager::{head_age, rpc_error, EndpointProber};
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::config::SelectorConfig;
use core_logic::{ChainConfig, RpcManager, Selection};
use ethers::middleware::SignerMiddleware;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Everything the flows need from the chain. Implemented over ethers by
/// [`AccountContext`] and by hand-written mocks in tests.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the signing account.
    fn address(&self) -> Address;

    fn chain(&self) -> &ChainConfig;

    /// Time since the latest block was produced.
    async fn head_age(&self) -> Result<Duration>;

    async fn balance(&self, who: Address) -> Result<U256>;

    async fn gas_price(&self) -> Result<U256>;

    /// Transaction count including pending transactions.
    async fn pending_nonce(&self) -> Result<U256>;

    /// Signs and broadcasts; returns once the node accepted the transaction.
    async fn send(&self, tx: TypedTransaction) -> Result<TxHash>;

    /// `None` when the transaction disappeared from the node.
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Option<TransactionReceipt>>;

    /// Read-only contract call against the latest block.
    async fn call(&self, tx: TypedTransaction) -> Result<Bytes>;

    /// Drops the current endpoint choice after a network failure.
    async fn reselect(&self) {}
}

struct Binding {
    url: String,
    client: Arc<SignerClient>,
}

struct State {
    rpc: RpcManager,
    binding: Option<Binding>,
}

/// Owns the endpoint cache and the signer built on top of the selected
/// endpoint. The signer is rebuilt only when the selected URL changes.
pub struct AccountContext {
    chain: ChainConfig,
    wallet: LocalWallet,
    prober: EndpointProber,
    state: Mutex<State>,
}

impl AccountContext {
    pub fn new(chain: ChainConfig, wallet: LocalWallet, selector: SelectorConfig) -> Result<Self> {
        let prober = EndpointProber::new(selector.probe_timeout())?;
        let rpc = RpcManager::new(chain.rpc_endpoints.clone(), selector)?;
        let wallet = wallet.with_chain_id(chain.chain_id);

        Ok(Self {
            chain,
            wallet,
            prober,
            state: Mutex::new(State { rpc, binding: None }),
        })
    }

    /// Current endpoint, probing all candidates if the cached choice expired.
    pub async fn select(&self) -> Result<Selection> {
        let mut state = self.state.lock().await;
        Self::select_locked(&self.prober, &mut state).await
    }

    async fn select_locked(prober: &EndpointProber, state: &mut State) -> Result<Selection> {
        if let Some(selection) = state.rpc.cached() {
            return Ok(selection);
        }

        debug!("Probing {} RPC endpoints", state.rpc.endpoints().len());
        let reports = prober.probe_all(state.rpc.endpoints()).await;
        let selection = state.rpc.choose(&reports)?;
        Ok(selection)
    }

    /// Signer connected to the selected endpoint.
    pub async fn signer(&self) -> Result<Arc<SignerClient>> {
        let mut state = self.state.lock().await;
        let selection = Self::select_locked(&self.prober, &mut state).await?;

        if let Some(binding) = &state.binding {
            if binding.url == selection.url {
                return Ok(binding.client.clone());
            }
        }

        info!("Connecting signer {:?} to {}", self.wallet.address(), selection.url);
        let provider = self.prober.provider_for(&selection.url)?;
        let client = Arc::new(SignerMiddleware::new(provider, self.wallet.clone()));
        state.binding = Some(Binding {
            url: selection.url,
            client: client.clone(),
        });
        Ok(client)
    }

}

#[async_trait]
impl ChainClient for AccountContext {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    async fn head_age(&self) -> Result<Duration> {
        let client = self.signer().await?;
        head_age(client.provider()).await
    }

    async fn balance(&self, who: Address) -> Result<U256> {
        let client = self.signer().await?;
        client
            .provider()
            .get_balance(who, None)
            .await
            .map_err(rpc_error)
            .context("Failed to fetch balance")
    }

    async fn gas_price(&self) -> Result<U256> {
        let client = self.signer().await?;
        client
            .provider()
            .get_gas_price()
            .await
            .map_err(rpc_error)
            .context("Failed to fetch gas price")
    }

    async fn pending_nonce(&self) -> Result<U256> {
        let client = self.signer().await?;
        client
            .provider()
            .get_transaction_count(self.wallet.address(), Some(BlockNumber::Pending.into()))
            .await
            .map_err(rpc_error)
            .context("Failed to fetch pending nonce")
    }

    async fn send(&self, tx: TypedTransaction) -> Result<TxHash> {
        let client = self.signer().await?;
        let pending = client.send_transaction(tx, None).await.map_err(rpc_error)?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Option<TransactionReceipt>> {
        let client = self.signer().await?;
        let provider = client.provider().clone();
        PendingTransaction::new(hash, &provider)
            .interval(Duration::from_secs(2))
            .confirmations(1)
            .await
            .map_err(rpc_error)
    }

    async fn call(&self, tx: TypedTransaction) -> Result<Bytes> {
        let client = self.signer().await?;
        client
            .provider()
            .call(&tx, None)
            .await
            .map_err(rpc_error)
            .context("Contract call failed")
    }

    /// Forces a new probe round on next use.
    async fn reselect(&self) {
        self.state.lock().await.rpc.invalidate();
    }
}
