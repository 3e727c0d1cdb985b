//! Configuration types for the ipwatch system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default resolver endpoint (IPv6 address echo service)
pub const DEFAULT_RESOLVER_URL: &str = "https://api6.ipify.org";

/// Main ipwatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Notification collaborator configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Where the notification recipient identifier comes from
    pub target: TargetConfig,

    /// Background monitor settings
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Interactive query settings
    #[serde(default)]
    pub query: QuerySettings,
}

impl WatchConfig {
    /// Create a configuration with defaults for the given target
    pub fn new(target: TargetConfig) -> Self {
        Self {
            resolver: ResolverConfig::default(),
            notifier: NotifierConfig::default(),
            target,
            monitor: MonitorSettings::default(),
            query: QuerySettings::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.resolver.validate()?;
        self.notifier.validate()?;
        self.target.validate()?;
        self.monitor.validate()?;
        self.query.validate()?;
        Ok(())
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Endpoint queried with `?format=json`
    #[serde(default = "default_resolver_url")]
    pub url: String,

    /// How to treat non-200 responses and missing `ip` fields
    #[serde(default)]
    pub anomaly: AnomalyPolicy,
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("Resolver URL cannot be empty"));
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Resolver URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            url: default_resolver_url(),
            anomaly: AnomalyPolicy::default(),
        }
    }
}

/// Handling of upstream data anomalies
///
/// An anomaly is a non-200 status, or a 200 whose body lacks a usable `ip`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyPolicy {
    /// Report the anomaly as `Failure(Other)` so it participates in retry
    #[default]
    Retry,
    /// Report the anomaly as a successful `"unknown"` resolution
    Sentinel,
}

impl std::str::FromStr for AnomalyPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "retry" => Ok(Self::Retry),
            "sentinel" => Ok(Self::Sentinel),
            other => Err(crate::Error::config(format!(
                "Unknown anomaly policy '{}'. Valid policies: retry, sentinel",
                other
            ))),
        }
    }
}

/// Notification collaborator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Write notifications to the log
    #[default]
    Log,

    /// POST notifications to a webhook
    Webhook {
        /// Webhook URL
        url: String,
        /// Optional bearer token
        token: Option<String>,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Log => Ok(()),
            NotifierConfig::Webhook { url, token } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Webhook URL cannot be empty"));
                }
                if token.as_deref().is_some_and(str::is_empty) {
                    return Err(crate::Error::config(
                        "Webhook token cannot be empty when set",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Log => "log",
            NotifierConfig::Webhook { .. } => "webhook",
        }
    }
}

/// Source of the notification recipient identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetConfig {
    /// Identifier given directly
    Inline {
        /// Recipient identifier
        id: String,
    },

    /// Identifier read from a file (surrounding whitespace trimmed)
    File {
        /// Path to the file
        path: String,
    },
}

impl TargetConfig {
    /// Validate the target configuration
    ///
    /// File contents are checked when the target is loaded.
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            TargetConfig::Inline { id } if id.trim().is_empty() => Err(crate::Error::config(
                "Notification target cannot be empty",
            )),
            TargetConfig::File { path } if path.is_empty() => Err(crate::Error::config(
                "Notification target file path cannot be empty",
            )),
            _ => Ok(()),
        }
    }
}

/// Background monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Sleep between normal ticks (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Sleep after a tick that returned an error (in seconds)
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Per-call resolver timeout (in seconds)
    #[serde(default = "default_monitor_timeout_secs")]
    pub timeout_secs: u64,

    /// Capacity of the monitor event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl MonitorSettings {
    /// Validate the monitor settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.error_backoff_secs == 0 {
            return Err(crate::Error::config("Error backoff must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Monitor resolver timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Error backoff as a [`Duration`]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    /// Resolver timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            timeout_secs: default_monitor_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Interactive query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySettings {
    /// Command name exposed on the interactive surface
    #[serde(default = "default_query_command")]
    pub command: String,

    /// Maximum resolution attempts per query
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay between attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Per-call resolver timeout (in seconds)
    #[serde(default = "default_query_timeout_secs")]
    pub timeout_secs: u64,
}

impl QuerySettings {
    /// Validate the query settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.command.trim().is_empty() {
            return Err(crate::Error::config("Query command name cannot be empty"));
        }
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(crate::Error::config(format!(
                "Query max attempts must be between 1 and 10. Got: {}",
                self.max_attempts
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Query resolver timeout must be > 0"));
        }
        Ok(())
    }

    /// Retry delay as a [`Duration`]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Resolver timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            command: default_query_command(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_query_timeout_secs(),
        }
    }
}

fn default_resolver_url() -> String {
    DEFAULT_RESOLVER_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_error_backoff_secs() -> u64 {
    5
}

fn default_monitor_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_query_command() -> String {
    "ipv6".to_string()
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    1
}

fn default_query_timeout_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(id: &str) -> TargetConfig {
        TargetConfig::Inline { id: id.to_string() }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = WatchConfig::new(inline("ops-channel"));

        assert_eq!(config.resolver.url, "https://api6.ipify.org");
        assert_eq!(config.resolver.anomaly, AnomalyPolicy::Retry);
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.monitor.error_backoff(), Duration::from_secs(5));
        assert_eq!(config.monitor.timeout(), Duration::from_secs(10));
        assert_eq!(config.query.max_attempts, 3);
        assert_eq!(config.query.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.query.timeout(), Duration::from_secs(5));
        assert_eq!(config.query.command, "ipv6");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_inline_target_is_rejected() {
        let config = WatchConfig::new(inline("   "));
        let err = config.validate().unwrap_err();
        assert!(err.is_config(), "unexpected error: {err}");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = WatchConfig::new(inline("ops-channel"));
        config.monitor.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn query_attempts_are_bounded() {
        let mut config = WatchConfig::new(inline("ops-channel"));
        config.query.max_attempts = 0;
        assert!(config.validate().is_err());

        config.query.max_attempts = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn webhook_requires_url() {
        let notifier = NotifierConfig::Webhook {
            url: String::new(),
            token: None,
        };
        assert!(notifier.validate().is_err());
        assert_eq!(notifier.type_name(), "webhook");
    }

    #[test]
    fn anomaly_policy_parses_case_insensitively() {
        assert_eq!("Sentinel".parse::<AnomalyPolicy>().unwrap(), AnomalyPolicy::Sentinel);
        assert_eq!("retry".parse::<AnomalyPolicy>().unwrap(), AnomalyPolicy::Retry);
        assert!("ignore".parse::<AnomalyPolicy>().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "target": { "type": "file", "path": "/etc/ipwatch/target" },
            "notifier": { "type": "webhook", "url": "https://hooks.example.net/ip" },
            "resolver": { "anomaly": "sentinel" }
        }"#;

        let config: WatchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.resolver.url, DEFAULT_RESOLVER_URL);
        assert_eq!(config.resolver.anomaly, AnomalyPolicy::Sentinel);
        assert_eq!(config.notifier.type_name(), "webhook");
        assert_eq!(config.monitor.poll_interval_secs, 300);
        assert!(matches!(config.target, TargetConfig::File { ref path } if path == "/etc/ipwatch/target"));
    }
}
