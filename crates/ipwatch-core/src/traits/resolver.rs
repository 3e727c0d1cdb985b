// # Resolver Trait
//
// Defines the interface for looking up the host's public address.
//
// ## Implementations
//
// - HTTP (ipify-style JSON echo service): `ipwatch-resolver-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ipwatch_core::{Resolver, ResolutionOutcome};
// use std::time::Duration;
//
// let resolver = /* Resolver implementation */;
//
// match resolver.resolve(Duration::from_secs(5)).await {
//     ResolutionOutcome::Success { address } => println!("address: {address}"),
//     ResolutionOutcome::Failure(reason) => println!("lookup failed: {reason}"),
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Placeholder address standing in for "no value obtained"
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Result of a single resolver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The resolver produced an address
    Success {
        /// The resolved address (or [`UNKNOWN_ADDRESS`] under the sentinel policy)
        address: String,
    },
    /// The resolver could not produce an address
    Failure(FailureReason),
}

impl ResolutionOutcome {
    /// Create a success outcome
    pub fn success(address: impl Into<String>) -> Self {
        Self::Success {
            address: address.into(),
        }
    }

    /// Create a timeout failure
    pub fn timeout() -> Self {
        Self::Failure(FailureReason::Timeout)
    }

    /// Create a generic failure
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(FailureReason::Other(message.into()))
    }

    /// The resolved address, if any
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Success { address } => Some(address),
            Self::Failure(_) => None,
        }
    }

    /// Whether this outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Why a resolver call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The call exceeded its timeout
    Timeout,
    /// Any other transport, status or parse problem
    Other(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timed out"),
            FailureReason::Other(message) => write!(f, "{}", message),
        }
    }
}

/// Trait for resolver implementations
///
/// A resolver performs exactly one lookup per call and never retries. Retry
/// and scheduling belong to [`crate::retry::RetryPolicy`].
///
/// Per-call problems are reported through [`ResolutionOutcome::Failure`],
/// never through panics, so callers can always classify the result.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Perform one lookup bounded by `timeout`
    async fn resolve(&self, timeout: Duration) -> ResolutionOutcome;

    /// Short name used in logs
    fn name(&self) -> &'static str {
        "resolver"
    }
}
