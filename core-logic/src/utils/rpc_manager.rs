//! # Core Logic - RPC Manager
//!
//! Chain-agnostic endpoint selection: given probe results for every
//! configured endpoint, pick the fastest one whose head is fresh, and keep
//! that choice for a bounded time. Chains do the actual probing.

use crate::config::{FallbackPolicy, SelectorConfig};
use crate::error::{ConfigError, NetworkError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of probing one endpoint.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub url: String,
    pub outcome: ProbeOutcome,
}

#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Reached { latency: Duration, head_age: Duration },
    Failed { reason: String },
}

impl ProbeReport {
    pub fn reached(url: impl Into<String>, latency: Duration, head_age: Duration) -> Self {
        Self {
            url: url.into(),
            outcome: ProbeOutcome::Reached { latency, head_age },
        }
    }

    pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outcome: ProbeOutcome::Failed {
                reason: reason.into(),
            },
        }
    }
}

/// The endpoint chosen by a probe round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub url: String,
    /// `None` when the endpoint was picked as a fallback.
    pub latency: Option<Duration>,
    pub fallback: bool,
}

/// Picks the lowest-latency endpoint whose head is at most `max_head_age`
/// old. Earlier reports win ties. Failed probes are never eligible.
pub fn select_endpoint(
    reports: &[ProbeReport],
    max_head_age: Duration,
    policy: FallbackPolicy,
) -> Result<Selection, NetworkError> {
    let mut best: Option<(usize, Duration)> = None;

    for (idx, report) in reports.iter().enumerate() {
        match &report.outcome {
            ProbeOutcome::Reached { latency, head_age } => {
                if *head_age > max_head_age {
                    warn!(
                        "RPC {} is not synchronized (head is {}s old)",
                        report.url,
                        head_age.as_secs()
                    );
                    continue;
                }
                if best.map_or(true, |(_, l)| *latency < l) {
                    best = Some((idx, *latency));
                }
            }
            ProbeOutcome::Failed { reason } => {
                warn!("RPC {} error: {}", report.url, reason);
            }
        }
    }

    match best {
        Some((index, latency)) => {
            info!(
                "Selected stable RPC: {} (latency {}ms)",
                reports[index].url,
                latency.as_millis()
            );
            Ok(Selection {
                index,
                url: reports[index].url.clone(),
                latency: Some(latency),
                fallback: false,
            })
        }
        None => match (policy, reports.first()) {
            (FallbackPolicy::UseFirst, Some(first)) => {
                warn!("No suitable RPC found. Using fallback: {}", first.url);
                Ok(Selection {
                    index: 0,
                    url: first.url.clone(),
                    latency: None,
                    fallback: true,
                })
            }
            _ => Err(NetworkError::NoEligibleEndpoint {
                candidates: reports.len(),
            }),
        },
    }
}

/// A selection that expires after a fixed time-to-live.
#[derive(Debug)]
pub struct EndpointCache {
    ttl: Duration,
    entry: Option<(Selection, Instant)>,
}

impl EndpointCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// The cached selection, if it has not expired.
    pub fn get(&self) -> Option<&Selection> {
        self.entry
            .as_ref()
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(sel, _)| sel)
    }

    pub fn store(&mut self, selection: Selection) {
        self.entry = Some((selection, Instant::now()));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// Endpoint list plus the cached choice among them.
#[derive(Debug)]
pub struct RpcManager {
    endpoints: Vec<String>,
    config: SelectorConfig,
    cache: EndpointCache,
}

impl RpcManager {
    pub fn new(endpoints: Vec<String>, config: SelectorConfig) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::MissingField {
                field: "rpc_url".to_string(),
            });
        }

        Ok(Self {
            endpoints,
            cache: EndpointCache::new(config.cache_ttl()),
            config,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Cached selection, or `None` when a new probe round is due.
    pub fn cached(&self) -> Option<Selection> {
        self.cache.get().cloned()
    }

    /// Applies the selection policy to a probe round and caches the result.
    pub fn choose(&mut self, reports: &[ProbeReport]) -> Result<Selection, NetworkError> {
        let selection =
            select_endpoint(reports, self.config.max_head_age(), self.config.fallback)?;
        self.cache.store(selection.clone());
        Ok(selection)
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }
}
