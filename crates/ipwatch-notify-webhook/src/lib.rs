// # Webhook Notifier
//
// This crate delivers ipwatch notifications to an HTTP webhook.
//
// ## Wire Format
//
// `POST <url>` with a JSON body:
//
// ```json
// { "target": "<recipient id>", "text": "<message>" }
// ```
//
// An optional bearer token is sent in the `Authorization` header.
//
// ## Constraints
//
// - One request per `notify()` call, no retries (the monitor owns backoff)
// - HTTP timeout of 30 seconds
// - Status codes map to typed errors (401/403, 429, 5xx)
//
// ## Security
//
// - The token NEVER appears in logs or Debug output
// - An empty token is rejected at construction

use async_trait::async_trait;
use ipwatch_core::config::NotifierConfig;
use ipwatch_core::{Error, NotificationTarget, Notifier, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Default HTTP timeout for webhook requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON body of a webhook delivery
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    target: &'a str,
    text: &'a str,
}

/// Webhook notifier
///
/// Stateless and single-shot: a delivery failure is returned to the caller
/// unchanged.
pub struct WebhookNotifier {
    /// Webhook URL
    url: String,

    /// Optional bearer token
    /// ⚠️ NEVER log this value
    token: Option<String>,

    /// HTTP client for deliveries
    client: reqwest::Client,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl WebhookNotifier {
    /// Create a webhook notifier
    ///
    /// # Parameters
    ///
    /// - `url`: Webhook endpoint
    /// - `token`: Optional bearer token (must not be empty when given)
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(Error::config("Webhook URL cannot be empty"));
        }
        if token.as_deref().is_some_and(str::is_empty) {
            return Err(Error::config("Webhook token cannot be empty when set"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, token, client })
    }

    /// Create a webhook notifier from configuration
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        match config {
            NotifierConfig::Webhook { url, token } => Self::new(url.clone(), token.clone()),
            other => Err(Error::config(format!(
                "Invalid config for webhook notifier: {}",
                other.type_name()
            ))),
        }
    }
}

/// Map a non-success status to a typed error
fn status_error(status: reqwest::StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Webhook rejected credentials. Status: {}",
            status
        )),
        429 => Error::rate_limited(format!(
            "Webhook rate limit exceeded. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            "webhook",
            format!("Webhook server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(
            "webhook",
            format!("Webhook delivery failed: {} - {}", status, body),
        ),
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, target: &NotificationTarget, text: &str) -> Result<()> {
        let payload = WebhookPayload {
            target: target.as_str(),
            text,
        };

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::provider("webhook", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        debug!("Webhook delivery to {} accepted ({})", target, status);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "webhook"
    }
}
