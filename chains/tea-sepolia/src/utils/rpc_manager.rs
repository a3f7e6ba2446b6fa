use anyhow::{Context, Result};
use core_logic::{NetworkError, ProbeReport};
use ethers::providers::{Http, Middleware, MiddlewareError, Provider};
use ethers::types::BlockNumber;
use reqwest::Client;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;
use url::Url;

/// Measures latency and head freshness of RPC endpoints.
#[derive(Debug, Clone)]
pub struct EndpointProber {
    client: Client,
    timeout: Duration,
}

impl EndpointProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, timeout })
    }

    pub fn provider_for(&self, url: &str) -> Result<Provider<Http>> {
        let url_parsed: Url = url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", url))?;
        Ok(Provider::new(Http::new_with_client(
            url_parsed,
            self.client.clone(),
        )))
    }

    /// Probes every endpoint in order. One failing endpoint never stops
    /// the others from being probed.
    pub async fn probe_all(&self, urls: &[String]) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(urls.len());
        for url in urls {
            reports.push(self.probe(url).await);
        }
        reports
    }

    pub async fn probe(&self, url: &str) -> ProbeReport {
        let provider = match self.provider_for(url) {
            Ok(p) => p,
            Err(e) => return ProbeReport::failed(url, format!("{:#}", e)),
        };

        let start = Instant::now();
        match tokio::time::timeout(self.timeout, head_age(&provider)).await {
            Ok(Ok(age)) => {
                let latency = start.elapsed();
                debug!(
                    "RPC {} answered in {}ms (head {}s old)",
                    url,
                    latency.as_millis(),
                    age.as_secs()
                );
                ProbeReport::reached(url, latency, age)
            }
            Ok(Err(e)) => ProbeReport::failed(url, format!("{:#}", e)),
            Err(_) => ProbeReport::failed(
                url,
                NetworkError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                    endpoint: url.to_string(),
                }
                .to_string(),
            ),
        }
    }
}

/// Time since the latest block's timestamp.
pub async fn head_age<M>(provider: &M) -> Result<Duration>
where
    M: Middleware,
    M::Error: 'static,
{
    let block = provider
        .get_block(BlockNumber::Latest)
        .await
        .map_err(rpc_error)?
        .context("Node returned no latest block")?;

    let head = block.timestamp.low_u64();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?
        .as_secs();

    Ok(Duration::from_secs(now.saturating_sub(head)))
}

/// Lifts a JSON-RPC error response into a typed [`NetworkError`] so retry
/// classification can see the node's code and message. Transport failures
/// keep their message for substring classification.
pub fn rpc_error<E: MiddlewareError + 'static>(err: E) -> anyhow::Error {
    match err.as_error_response() {
        Some(resp) => anyhow::Error::new(NetworkError::Rpc {
            code: resp.code,
            message: resp.message.clone(),
        }),
        None => anyhow::Error::new(err),
    }
}
