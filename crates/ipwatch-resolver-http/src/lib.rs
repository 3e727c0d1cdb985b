// # HTTP Address Resolver
//
// This crate provides the HTTP resolver for the ipwatch monitor.
//
// ## Protocol
//
// One `GET <url>?format=json` per call. The endpoint answers with
// `{"ip": "<address>"}` (ipify style). The body is untrusted: a missing,
// empty or unparsable `ip` must never crash the caller.
//
// ## Outcome Mapping
//
// | Situation                         | Retry policy       | Sentinel policy      |
// |-----------------------------------|--------------------|----------------------|
// | 200 with a valid `ip`             | `Success{ip}`      | `Success{ip}`        |
// | 200 with missing/empty/bad `ip`   | `Failure(Other)`   | `Success{"unknown"}` |
// | non-200 status                    | `Failure(Other)`   | `Success{"unknown"}` |
// | timeout                           | `Failure(Timeout)` | `Failure(Timeout)`   |
// | connection error, non-JSON body   | `Failure(Other)`   | `Failure(Other)`     |
//
// ## Constraints
//
// - Exactly one request per `resolve()` call
// - No retries, no caching, no background tasks (owned by `RetryPolicy`)

use async_trait::async_trait;
use ipwatch_core::config::{AnomalyPolicy, ResolverConfig};
use ipwatch_core::{Error, ResolutionOutcome, Resolver, Result, UNKNOWN_ADDRESS};
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Body returned by the echo service
#[derive(Debug, Deserialize)]
struct EchoResponse {
    #[serde(default)]
    ip: Option<String>,
}

/// Resolves the public address through an HTTP echo service
#[derive(Debug, Clone)]
pub struct HttpResolver {
    /// Endpoint URL (without query string)
    url: String,

    /// Treatment of upstream data anomalies
    anomaly: AnomalyPolicy,

    /// HTTP client (timeouts are set per request)
    client: reqwest::Client,
}

impl HttpResolver {
    /// Create a resolver for `url`
    pub fn new(url: impl Into<String>, anomaly: AnomalyPolicy) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(Error::config("Resolver URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url,
            anomaly,
            client,
        })
    }

    /// Create a resolver from configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.url.clone(), config.anomaly)
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Active anomaly policy
    pub fn anomaly_policy(&self) -> AnomalyPolicy {
        self.anomaly
    }

    /// Map an upstream data anomaly according to the policy
    fn anomaly(&self, message: String) -> ResolutionOutcome {
        match self.anomaly {
            AnomalyPolicy::Retry => ResolutionOutcome::failure(message),
            AnomalyPolicy::Sentinel => {
                debug!("{}, reporting {}", message, UNKNOWN_ADDRESS);
                ResolutionOutcome::success(UNKNOWN_ADDRESS)
            }
        }
    }

    async fn fetch(&self, timeout: Duration) -> std::result::Result<ResolutionOutcome, reqwest::Error> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("format", "json")])
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Ok(self.anomaly(format!("HTTP {}", status)));
        }

        let body: EchoResponse = response.json().await?;

        let Some(ip) = body.ip.map(|ip| ip.trim().to_string()).filter(|ip| !ip.is_empty()) else {
            return Ok(self.anomaly("Response has no ip field".to_string()));
        };

        match ip.parse::<IpAddr>() {
            Ok(addr) => Ok(ResolutionOutcome::success(addr.to_string())),
            Err(_) => Ok(self.anomaly(format!("Invalid IP address in response: {}", ip))),
        }
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(&self, timeout: Duration) -> ResolutionOutcome {
        match self.fetch(timeout).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_timeout() => ResolutionOutcome::timeout(),
            Err(e) if e.is_decode() => {
                ResolutionOutcome::failure(format!("Malformed response body: {}", e))
            }
            Err(e) => ResolutionOutcome::failure(format!("Request failed: {}", e)),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
