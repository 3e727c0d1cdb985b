//! Interactive address query
//!
//! A foreground lookup with bounded retry and incremental progress. Each
//! invocation is independent of the background monitor; the two share only
//! the stateless [`Resolver`].
//!
//! ## Progress sequence
//!
//! ```text
//! Started, AttemptFailed{1}, ..., AttemptFailed{k}, Resolved{address}
//! Started, AttemptFailed{1}, ..., AttemptFailed{max}, Exhausted{max, "unknown"}
//! ```
//!
//! Every query ends with exactly one final message.

use crate::config::QuerySettings;
use crate::retry::{BoundedOutcome, RetryPolicy};
use crate::traits::{FailureReason, Resolver};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// One progress message of an interactive query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryProgress {
    /// Query accepted
    Started,

    /// An attempt failed and another may follow
    AttemptFailed {
        attempt: usize,
        reason: FailureReason,
    },

    /// Address resolved (final)
    Resolved {
        address: String,
    },

    /// All attempts failed (final)
    Exhausted {
        attempts: usize,
        address: String,
    },
}

impl QueryProgress {
    /// Whether this is the last message of a query
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Resolved { .. } | Self::Exhausted { .. })
    }
}

impl fmt::Display for QueryProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryProgress::Started => write!(f, "Looking up your public address..."),
            QueryProgress::AttemptFailed {
                attempt,
                reason: FailureReason::Timeout,
            } => write!(f, "Attempt {} timed out, retrying...", attempt),
            QueryProgress::AttemptFailed { attempt, reason } => {
                write!(f, "Attempt {} failed: {}", attempt, reason)
            }
            QueryProgress::Resolved { address } => {
                write!(f, "Your public address is: {}", address)
            }
            QueryProgress::Exhausted { attempts, address } => write!(
                f,
                "Lookup failed after {} attempts, your public address is: {}",
                attempts, address
            ),
        }
    }
}

/// Foreground address lookup
#[derive(Clone)]
pub struct AddressQuery {
    resolver: Arc<dyn Resolver>,
    policy: RetryPolicy,
}

impl AddressQuery {
    /// Create a query using `policy` (normally bounded)
    pub fn new(resolver: Arc<dyn Resolver>, policy: RetryPolicy) -> Self {
        Self { resolver, policy }
    }

    /// Create a query from settings
    pub fn from_settings(resolver: Arc<dyn Resolver>, settings: &QuerySettings) -> Self {
        Self::new(resolver, RetryPolicy::from(settings))
    }

    /// Run the query, passing each progress message to `emit` in order
    pub async fn run<F>(&self, mut emit: F) -> BoundedOutcome
    where
        F: FnMut(QueryProgress) + Send,
    {
        emit(QueryProgress::Started);

        let outcome = self
            .policy
            .run_bounded(self.resolver.as_ref(), |attempt, reason| {
                emit(QueryProgress::AttemptFailed {
                    attempt,
                    reason: reason.clone(),
                })
            })
            .await;

        if outcome.exhausted {
            emit(QueryProgress::Exhausted {
                attempts: outcome.attempts,
                address: outcome.address.clone(),
            });
        } else {
            emit(QueryProgress::Resolved {
                address: outcome.address.clone(),
            });
        }

        outcome
    }

    /// Spawn the query and stream its progress messages
    ///
    /// The stream ends after the final message.
    pub fn stream(&self) -> Pin<Box<dyn Stream<Item = QueryProgress> + Send + 'static>> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let query = self.clone();

        tokio::spawn(async move {
            query
                .run(|progress| {
                    // Receiver gone means the caller stopped listening.
                    let _ = tx.send(progress);
                })
                .await;
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

impl fmt::Debug for AddressQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressQuery")
            .field("resolver", &self.resolver.name())
            .field("policy", &self.policy)
            .finish()
    }
}
