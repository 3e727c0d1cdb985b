// # ipwatchd - Public Address Monitor Daemon
//
// This is a THIN integration layer:
// - DO NOT add detection, retry or scheduling logic here
// - All monitoring logic lives in ipwatch-core
// - Configuration is via environment variables ONLY
//
// The ipwatchd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the resolver and notifier
// 4. Running the background monitor
// 5. Serving the interactive lookup command on stdin
//
// ## Configuration
//
// ### Resolver
// - `IPWATCH_RESOLVER_URL`: Echo endpoint (default https://api6.ipify.org)
// - `IPWATCH_ANOMALY_POLICY`: `retry` (default) or `sentinel`
//
// ### Notifier
// - `IPWATCH_NOTIFIER_TYPE`: `log` (default) or `webhook`
// - `IPWATCH_WEBHOOK_URL`: Webhook endpoint (for webhook)
// - `IPWATCH_WEBHOOK_TOKEN`: Optional bearer token (for webhook)
//
// ### Recipient (one of)
// - `IPWATCH_TARGET`: Recipient identifier
// - `IPWATCH_TARGET_FILE`: File holding the recipient identifier
//
// ### Schedule
// - `IPWATCH_POLL_INTERVAL_SECS`: Background poll interval (default 300)
// - `IPWATCH_ERROR_BACKOFF_SECS`: Sleep after a failed tick (default 5)
//
// ### Interactive lookup
// - `IPWATCH_QUERY_COMMAND`: Command name read from stdin (default `ipv6`)
// - `IPWATCH_QUERY_MAX_ATTEMPTS`: Attempts per lookup (default 3)
//
// ## Example
//
// ```bash
// export IPWATCH_NOTIFIER_TYPE=webhook
// export IPWATCH_WEBHOOK_URL=https://hooks.example.net/ip
// export IPWATCH_TARGET_FILE=/etc/ipwatch/target
//
// ipwatchd
// ```

use anyhow::{Context, Result};
use ipwatch_core::{
    AddressQuery, IpMonitor, LogNotifier, MonitorEvent, MonitorHandle, Notifier, NotifierConfig,
    Resolver, TargetConfig, WatchConfig,
};
use ipwatch_resolver_http::HttpResolver;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long to wait for the monitor to exit after a stop request
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IpwatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<IpwatchExitCode> for ExitCode {
    fn from(code: IpwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration read from the environment
struct Config {
    watch: WatchConfig,
    log_level: Level,
}

/// Read an optional numeric variable
fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} must be a number. Got '{}': {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

fn parse_log_level(raw: &str) -> Result<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "IPWATCH_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let target = match (env::var("IPWATCH_TARGET"), env::var("IPWATCH_TARGET_FILE")) {
            (Ok(id), Err(_)) => TargetConfig::Inline { id },
            (Err(_), Ok(path)) => TargetConfig::File { path },
            (Ok(_), Ok(_)) => anyhow::bail!(
                "Set only one of IPWATCH_TARGET and IPWATCH_TARGET_FILE"
            ),
            (Err(_), Err(_)) => anyhow::bail!(
                "A notification recipient is required. \
                Set it via: export IPWATCH_TARGET=<id> or IPWATCH_TARGET_FILE=<path>"
            ),
        };

        let mut watch = WatchConfig::new(target);

        if let Ok(url) = env::var("IPWATCH_RESOLVER_URL") {
            watch.resolver.url = url;
        }
        if let Ok(policy) = env::var("IPWATCH_ANOMALY_POLICY") {
            watch.resolver.anomaly = policy.parse()?;
        }

        watch.notifier = match env::var("IPWATCH_NOTIFIER_TYPE").as_deref() {
            Err(_) | Ok("log") => NotifierConfig::Log,
            Ok("webhook") => NotifierConfig::Webhook {
                url: env::var("IPWATCH_WEBHOOK_URL").map_err(|_| {
                    anyhow::anyhow!(
                        "IPWATCH_WEBHOOK_URL is required when IPWATCH_NOTIFIER_TYPE=webhook"
                    )
                })?,
                token: env::var("IPWATCH_WEBHOOK_TOKEN").ok(),
            },
            Ok(other) => anyhow::bail!(
                "IPWATCH_NOTIFIER_TYPE '{}' is not supported. \
                Supported types: log, webhook",
                other
            ),
        };

        if let Some(secs) = parse_var("IPWATCH_POLL_INTERVAL_SECS")? {
            watch.monitor.poll_interval_secs = secs;
        }
        if let Some(secs) = parse_var("IPWATCH_ERROR_BACKOFF_SECS")? {
            watch.monitor.error_backoff_secs = secs;
        }
        if let Ok(command) = env::var("IPWATCH_QUERY_COMMAND") {
            watch.query.command = command;
        }
        if let Some(attempts) = parse_var("IPWATCH_QUERY_MAX_ATTEMPTS")? {
            watch.query.max_attempts = attempts;
        }

        let log_level =
            parse_log_level(&env::var("IPWATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))?;

        Ok(Self { watch, log_level })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.watch.validate()?;

        if self.watch.resolver.url.starts_with("http://") {
            eprintln!(
                "WARNING: IPWATCH_RESOLVER_URL uses HTTP (not HTTPS). \
                This is less secure. Consider using HTTPS."
            );
        }

        #[cfg(not(feature = "webhook"))]
        if matches!(self.watch.notifier, NotifierConfig::Webhook { .. }) {
            anyhow::bail!("IPWATCH_NOTIFIER_TYPE=webhook requires the `webhook` feature");
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IpwatchExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return IpwatchExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpwatchExitCode::ConfigError.into();
    }

    info!("Starting ipwatchd daemon");
    info!(
        "Resolver: {} (anomaly policy {:?}), notifier: {}",
        config.watch.resolver.url,
        config.watch.resolver.anomaly,
        config.watch.notifier.type_name()
    );

    // All work is I/O bound; one thread is enough.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpwatchExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config.watch).await {
            Ok(()) => IpwatchExitCode::CleanShutdown,
            Err(e) if is_config_error(&e) => {
                error!("Startup error: {:#}", e);
                IpwatchExitCode::ConfigError
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                IpwatchExitCode::RuntimeError
            }
        }
    });

    // Detached query tasks and the blocking stdin reader must not hold the process.
    rt.shutdown_timeout(Duration::from_secs(1));

    code.into()
}

fn is_config_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ipwatch_core::Error>()
        .is_some_and(ipwatch_core::Error::is_config)
}

fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match config {
        NotifierConfig::Log => Ok(Arc::new(LogNotifier::new())),
        #[cfg(feature = "webhook")]
        NotifierConfig::Webhook { .. } => Ok(Arc::new(
            ipwatch_notify_webhook::WebhookNotifier::from_config(config)?,
        )),
        #[cfg(not(feature = "webhook"))]
        NotifierConfig::Webhook { .. } => {
            anyhow::bail!("Webhook notifier support was not compiled in")
        }
    }
}

/// Run the daemon
async fn run_daemon(config: WatchConfig) -> Result<()> {
    let resolver: Arc<dyn Resolver> = Arc::new(HttpResolver::from_config(&config.resolver)?);
    let notifier = build_notifier(&config.notifier)?;

    let (monitor, events) = IpMonitor::from_config(&config, resolver.clone(), notifier).await?;
    let handle = monitor.spawn();
    tokio::spawn(log_events(events));

    let query = AddressQuery::from_settings(resolver, &config.query);
    tokio::spawn(serve_commands(query, config.query.command.clone()));

    info!(
        "Monitoring public address (send '{}' on stdin for a lookup)",
        config.query.command
    );

    let signal = wait_for_shutdown().await;
    match &signal {
        Ok(name) => info!("Received shutdown signal: {}", name),
        Err(e) => error!("Signal handling failed, shutting down: {}", e),
    }

    stop_monitor(handle).await?;
    signal.map(|_| ())
}

/// Stop the monitor and wait a bounded time for it to exit
async fn stop_monitor(handle: MonitorHandle) -> Result<()> {
    info!("Shutting down monitor");
    tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.shutdown())
        .await
        .with_context(|| format!("Monitor did not stop within {:?}", SHUTDOWN_TIMEOUT))??;
    info!("Monitor stopped");
    Ok(())
}

/// Log monitor events
async fn log_events(mut events: mpsc::Receiver<MonitorEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            MonitorEvent::Started { target } => info!("Monitor running, notifying {}", target),
            MonitorEvent::Seeded { address } => info!("Initial public address: {}", address),
            MonitorEvent::AddressChanged { old, new } => {
                info!("Public address changed: {} -> {}", old, new)
            }
            MonitorEvent::Unchanged { address } => debug!("Public address unchanged: {}", address),
            MonitorEvent::ResolveFailed { reason } => debug!("Lookup failed: {}", reason),
            MonitorEvent::NotificationFailed { error } => {
                warn!("Notification not delivered: {}", error)
            }
            MonitorEvent::Stopped { reason, ticks } => {
                info!("Monitor stopped after {} tick(s): {}", ticks, reason)
            }
        }
    }
}

/// Whether an input line invokes the lookup command
fn is_query_command(line: &str, command: &str) -> bool {
    let line = line.trim();
    line.strip_prefix('/').unwrap_or(line) == command
}

/// Read commands from stdin; each lookup runs as its own task
async fn serve_commands(query: AddressQuery, command: String) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_query_command(&line, &command) => {
                let mut progress = query.stream();
                tokio::spawn(async move {
                    while let Some(message) = progress.next().await {
                        println!("{}", message);
                    }
                });
            }
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => debug!("Ignoring unknown command: {}", line.trim()),
            Ok(None) => {
                debug!("stdin closed, interactive lookups disabled");
                break;
            }
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
