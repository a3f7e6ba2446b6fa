#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use core_logic::config::{HealthConfig, SubmitConfig};
use core_logic::{Artifact, BuildTool, ChainConfig, GasConfig, ToolError, VerifyOutcome};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TxHash, H160, H256, U256, U64};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tea_project::client::ChainClient;
use tea_project::health::HealthGate;
use tea_project::submitter::Submitter;

pub const DEPLOYED: Address = H160([0xde; 20]);

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

/// Scripted chain. Every `send` pops the next scripted error, if any.
pub struct MockClient {
    chain: ChainConfig,
    signer: Address,
    pub head_age: Mutex<Duration>,
    head_age_script: Mutex<VecDeque<Duration>>,
    pub balances: Mutex<HashMap<Address, U256>>,
    pub gas_price: Mutex<U256>,
    pub receipt_status: Mutex<u64>,
    send_errors: Mutex<VecDeque<anyhow::Error>>,
    call_results: Mutex<HashMap<[u8; 4], Bytes>>,
    pub sent: Mutex<Vec<TypedTransaction>>,
    pub nonce_fetches: AtomicUsize,
    pub gas_price_fetches: AtomicUsize,
    pub reselects: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        let signer = addr(0xaa);
        let mut balances = HashMap::new();
        balances.insert(signer, U256::exp10(20));

        Self {
            chain: ChainConfig {
                name: "tea-sepolia".to_string(),
                rpc_endpoints: vec!["http://localhost:8545".to_string()],
                chain_id: 10218,
                explorer_url: Some("https://sepolia.tea.xyz".to_string()),
            },
            signer,
            head_age: Mutex::new(Duration::from_secs(2)),
            head_age_script: Mutex::new(VecDeque::new()),
            balances: Mutex::new(balances),
            gas_price: Mutex::new(U256::from(1_000_000_000u64)),
            receipt_status: Mutex::new(1),
            send_errors: Mutex::new(VecDeque::new()),
            call_results: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            nonce_fetches: AtomicUsize::new(0),
            gas_price_fetches: AtomicUsize::new(0),
            reselects: AtomicUsize::new(0),
        }
    }

    pub fn fail_sends_with(&self, messages: &[&str]) {
        let mut errors = self.send_errors.lock().unwrap();
        for m in messages {
            errors.push_back(anyhow!(m.to_string()));
        }
    }

    pub fn fail_send_with_error(&self, err: anyhow::Error) {
        self.send_errors.lock().unwrap().push_back(err);
    }

    /// Head ages returned by the next polls before falling back to `head_age`.
    pub fn script_head_ages(&self, ages: &[Duration]) {
        self.head_age_script.lock().unwrap().extend(ages.iter().copied());
    }

    pub fn set_balance(&self, who: Address, amount: U256) {
        self.balances.lock().unwrap().insert(who, amount);
    }

    pub fn respond_to_call(&self, selector: [u8; 4], data: Vec<u8>) {
        self.call_results
            .lock()
            .unwrap()
            .insert(selector, Bytes::from(data));
    }

    pub fn sent(&self) -> Vec<TypedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainClient for MockClient {
    fn address(&self) -> Address {
        self.signer
    }

    fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    async fn head_age(&self) -> Result<Duration> {
        if let Some(age) = self.head_age_script.lock().unwrap().pop_front() {
            return Ok(age);
        }
        Ok(*self.head_age.lock().unwrap())
    }

    async fn balance(&self, who: Address) -> Result<U256> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&who)
            .copied()
            .unwrap_or_default())
    }

    async fn gas_price(&self) -> Result<U256> {
        self.gas_price_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(*self.gas_price.lock().unwrap())
    }

    async fn pending_nonce(&self) -> Result<U256> {
        let n = self.nonce_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(U256::from(n))
    }

    async fn send(&self, tx: TypedTransaction) -> Result<TxHash> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx);
        if let Some(err) = self.send_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(H256::from_low_u64_be(sent.len() as u64))
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Option<TransactionReceipt>> {
        Ok(Some(TransactionReceipt {
            transaction_hash: hash,
            status: Some(U64::from(*self.receipt_status.lock().unwrap())),
            contract_address: Some(DEPLOYED),
            ..Default::default()
        }))
    }

    async fn call(&self, tx: TypedTransaction) -> Result<Bytes> {
        let data = tx.data().cloned().unwrap_or_default();
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        self.call_results
            .lock()
            .unwrap()
            .get(&selector)
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted"))
    }

    async fn reselect(&self) {
        self.reselects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Submitter with no backoff so retry tests run instantly.
pub fn fast_submitter() -> Submitter {
    Submitter::new(
        SubmitConfig {
            max_retries: 3,
            nonce_backoff_ms: 0,
            network_backoff_ms: 0,
            confirmation_timeout_secs: None,
        },
        GasConfig::default(),
    )
}

pub fn gate(max_polls: Option<u32>) -> HealthGate {
    HealthGate::new(HealthConfig {
        max_head_age_secs: 30,
        min_balance_ether: 0.01,
        poll_interval_secs: 0,
        max_polls,
    })
    .unwrap()
}

/// Build tool with a compiled artifact and a scripted verifier.
pub struct MockBuildTool {
    pub ready: Result<bool, ToolError>,
    outcomes: Mutex<VecDeque<VerifyOutcome>>,
    pub verify_calls: AtomicUsize,
    pub last_args: Mutex<Vec<String>>,
}

impl MockBuildTool {
    pub fn new(outcomes: Vec<VerifyOutcome>) -> Self {
        Self {
            ready: Ok(true),
            outcomes: Mutex::new(outcomes.into()),
            verify_calls: AtomicUsize::new(0),
            last_args: Mutex::new(Vec::new()),
        }
    }

    pub fn not_ready(mut self, err: Option<ToolError>) -> Self {
        self.ready = match err {
            Some(e) => Err(e),
            None => Ok(false),
        };
        self
    }
}

#[async_trait]
impl BuildTool for MockBuildTool {
    async fn ensure_ready(&self) -> Result<bool> {
        self.ready.clone().map_err(Into::into)
    }

    async fn compile(&self) -> Result<Artifact> {
        Ok(Artifact {
            abi: json!([{
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [
                    {"name": "_name", "type": "string"},
                    {"name": "_symbol", "type": "string"},
                    {"name": "_decimals", "type": "uint8"},
                    {"name": "_totalSupply", "type": "uint256"}
                ]
            }]),
            bytecode: "0x6080604052".to_string(),
        })
    }

    async fn verify(&self, _address: &str, constructor_args: &[String]) -> Result<VerifyOutcome> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock().unwrap() = constructor_args.to_vec();
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(VerifyOutcome::NotConfirmed {
                output: "Error: explorer unavailable".to_string(),
            }))
    }
}
