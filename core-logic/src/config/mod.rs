use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard ceiling on confirmed transactions per calendar day.
pub const DAILY_TX_LIMIT: u64 = 3500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_endpoints: Vec<String>,
    pub chain_id: u64,
    pub explorer_url: Option<String>,
}

impl ChainConfig {
    /// Splits a comma-separated endpoint list, keeping the configured order.
    pub fn parse_endpoints(raw: &str) -> Result<Vec<String>, ConfigError> {
        let urls: Vec<String> = raw
            .split(',')
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();

        if urls.is_empty() {
            return Err(ConfigError::MissingField {
                field: "rpc_url".to_string(),
            });
        }

        for url in &urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidRpcUrl { url: url.clone() });
            }
        }

        Ok(urls)
    }

    /// Explorer link for a transaction hash, if an explorer is configured.
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

/// What to do when no probed endpoint has a fresh head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Use the first configured endpoint and log a warning.
    #[default]
    UseFirst,
    /// Refuse to select anything.
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub cache_ttl_secs: u64,
    pub max_head_age_secs: u64,
    pub probe_timeout_secs: u64,
    pub fallback: FallbackPolicy,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            max_head_age_secs: 30,
            probe_timeout_secs: 10,
            fallback: FallbackPolicy::UseFirst,
        }
    }
}

impl SelectorConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn max_head_age(&self) -> Duration {
        Duration::from_secs(self.max_head_age_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    pub max_retries: u32,
    pub nonce_backoff_ms: u64,
    pub network_backoff_ms: u64,
    /// Unbounded when unset.
    pub confirmation_timeout_secs: Option<u64>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            nonce_backoff_ms: 5_000,
            network_backoff_ms: 10_000,
            confirmation_timeout_secs: None,
        }
    }
}

impl SubmitConfig {
    pub fn nonce_backoff(&self) -> Duration {
        Duration::from_millis(self.nonce_backoff_ms)
    }

    pub fn network_backoff(&self) -> Duration {
        Duration::from_millis(self.network_backoff_ms)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub max_head_age_secs: u64,
    pub min_balance_ether: f64,
    pub poll_interval_secs: u64,
    /// Blocks forever when unset.
    pub max_polls: Option<u32>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_head_age_secs: 30,
            min_balance_ether: 0.01,
            poll_interval_secs: 10,
            max_polls: None,
        }
    }
}

impl HealthConfig {
    pub fn max_head_age(&self) -> Duration {
        Duration::from_secs(self.max_head_age_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    pub min_native_amount: f64,
    pub max_native_amount: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 10,
            max_delay_secs: 60,
            min_native_amount: 0.001,
            max_native_amount: 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoints_keeps_order() {
        let urls =
            ChainConfig::parse_endpoints(" https://a.example , https://b.example,,").unwrap();
        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_parse_endpoints_rejects_garbage() {
        assert!(matches!(
            ChainConfig::parse_endpoints("ftp://nope"),
            Err(ConfigError::InvalidRpcUrl { .. })
        ));
        assert!(matches!(
            ChainConfig::parse_endpoints(" , "),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_tx_url() {
        let mut chain = ChainConfig {
            name: "tea-sepolia".to_string(),
            rpc_endpoints: vec![],
            chain_id: 10218,
            explorer_url: Some("https://sepolia.tea.xyz/".to_string()),
        };
        assert_eq!(
            chain.tx_url("0xabc").as_deref(),
            Some("https://sepolia.tea.xyz/tx/0xabc")
        );
        chain.explorer_url = Some(String::new());
        assert!(chain.tx_url("0xabc").is_none());
    }
}
