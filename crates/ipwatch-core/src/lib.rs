// # ipwatch-core
//
// Core library for the ipwatch public address monitor.
//
// ## Architecture Overview
//
// This library provides the core functionality for watching a host's public
// address:
// - **Resolver**: Trait for one bounded-timeout address lookup
// - **Notifier**: Trait for delivering a message to the configured recipient
// - **RetryPolicy**: Bounded (foreground) and unbounded (background) strategies
// - **ChangeDetector**: Decides whether a fresh resolution is a genuine change
// - **IpMonitor**: Background task tying resolution → detection → notification
// - **AddressQuery**: Foreground lookup with incremental progress
//
// ## Design Principles
//
// 1. **Single owner**: The monitor exclusively owns the address state
// 2. **No hidden retries**: Resolvers and notifiers make one attempt per call
// 3. **Explicit lifecycle**: The monitor stops only through its shutdown signal
// 4. **Library-First**: The daemon is a thin layer over this crate

pub mod traits;
pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod query;
pub mod retry;
pub mod shutdown;
pub mod state;

// Re-export core types for convenience
pub use traits::{
    FailureReason, NotificationTarget, Notifier, ResolutionOutcome, Resolver, UNKNOWN_ADDRESS,
};
pub use engine::{IpMonitor, MonitorEvent, MonitorHandle, MonitorPhase, STARTUP_MESSAGE};
pub use config::{AnomalyPolicy, NotifierConfig, ResolverConfig, TargetConfig, WatchConfig};
pub use error::{Error, Result};
pub use notify::{LogNotifier, NotificationDispatcher};
pub use query::{AddressQuery, QueryProgress};
pub use retry::{BoundedOutcome, RetryContext, RetryPolicy, TickHandler};
pub use shutdown::{ShutdownSignal, ShutdownTrigger, shutdown_channel};
pub use state::{AddressState, ChangeDetector, Transition};
