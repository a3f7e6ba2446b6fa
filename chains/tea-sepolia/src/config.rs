use anyhow::{Context, Result};
use config::{Config, Environment, File};
use core_logic::config::{BatchConfig, HealthConfig, SelectorConfig, SubmitConfig};
use core_logic::{ChainConfig, ConfigError, GasConfig, GasConfigToml};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const DEFAULT_RPC_URL: &str = "https://tea-sepolia.g.alchemy.com/public";
pub const DEFAULT_CHAIN_ID: u64 = 10218;
pub const DEFAULT_EXPLORER_URL: &str = "https://sepolia.tea.xyz";

/// Hex-encoded signing key. Wiped on drop and never printed.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***REDACTED***")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeployConfig {
    pub verify_attempts: u32,
    pub verify_delay_ms: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            verify_attempts: 3,
            verify_delay_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TeaConfig {
    pub main_private_key: Option<PrivateKey>,
    /// Comma-separated, tried in order.
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: String,
    pub explorer_api_key: Option<String>,
    pub contract_address: Option<String>,
    /// Network name used in the Hardhat config and verify command.
    pub network_name: String,
    pub state_dir: PathBuf,
    pub recipients_file: PathBuf,
    pub env_file: PathBuf,
    pub hardhat_dir: PathBuf,
    pub log_dir: PathBuf,
    pub selector: SelectorConfig,
    pub submit: SubmitConfig,
    pub health: HealthConfig,
    pub batch: BatchConfig,
    pub gas: GasConfigToml,
    pub deploy: DeployConfig,
}

impl Default for TeaConfig {
    fn default() -> Self {
        Self {
            main_private_key: None,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            explorer_api_key: None,
            contract_address: None,
            network_name: "tea-sepolia".to_string(),
            state_dir: PathBuf::from("."),
            recipients_file: PathBuf::from("verified_addresses.txt"),
            env_file: PathBuf::from(".env"),
            hardhat_dir: PathBuf::from("."),
            log_dir: PathBuf::from("logs"),
            selector: SelectorConfig::default(),
            submit: SubmitConfig::default(),
            health: HealthConfig::default(),
            batch: BatchConfig::default(),
            gas: GasConfigToml::default(),
            deploy: DeployConfig::default(),
        }
    }
}

impl TeaConfig {
    /// Optional TOML file at `path`, overridden by process environment
    /// variables (`MAIN_PRIVATE_KEY`, `RPC_URL`, `CHAIN_ID`, ...).
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_env(path, Environment::default().try_parsing(true))
    }

    pub fn load_with_env(path: &str, env: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let config: TeaConfig = settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!(e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ChainConfig::parse_endpoints(&self.rpc_url)?;

        if self.batch.min_native_amount <= 0.0
            || self.batch.min_native_amount > self.batch.max_native_amount
        {
            return Err(ConfigError::InvalidValue {
                field: "batch.min_native_amount".to_string(),
                reason: "must be positive and not above batch.max_native_amount".to_string(),
            });
        }

        if self.submit.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "submit.max_retries".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        Ok(())
    }

    pub fn chain_config(&self) -> Result<ChainConfig, ConfigError> {
        Ok(ChainConfig {
            name: self.network_name.clone(),
            rpc_endpoints: ChainConfig::parse_endpoints(&self.rpc_url)?,
            chain_id: self.chain_id,
            explorer_url: Some(self.explorer_url.clone()).filter(|u| !u.trim().is_empty()),
        })
    }

    /// The signing wallet bound to the configured chain id.
    pub fn wallet(&self) -> Result<LocalWallet, ConfigError> {
        let key = self
            .main_private_key
            .as_ref()
            .filter(|k| !k.expose().is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "MAIN_PRIVATE_KEY".to_string(),
            })?;

        let wallet = key
            .expose()
            .parse::<LocalWallet>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "MAIN_PRIVATE_KEY".to_string(),
                reason: e.to_string(),
            })?;

        Ok(wallet.with_chain_id(self.chain_id))
    }

    /// Deployed token address, if one is configured.
    pub fn contract_address(&self) -> Result<Option<Address>, ConfigError> {
        match self.contract_address.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<Address>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue {
                    field: "CONTRACT_ADDRESS".to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn gas_config(&self) -> GasConfig {
        self.gas.clone().into()
    }
}
