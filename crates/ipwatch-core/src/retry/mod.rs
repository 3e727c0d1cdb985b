//! Retry strategies built on a [`Resolver`]
//!
//! Both consumers share one [`RetryPolicy`] type and differ only in its
//! parameters:
//!
//! - **Bounded** ([`RetryPolicy::run_bounded`]): foreground lookups. A fixed
//!   number of attempts with a delay between failures; returns as soon as an
//!   attempt succeeds.
//! - **Unbounded** ([`RetryPolicy::run_forever`]): the background monitor.
//!   Resolves on every tick, hands the outcome to a [`TickHandler`] and sleeps
//!   until cancelled.
//!
//! ## Sleep selection (unbounded)
//!
//! ```text
//! tick body Ok  ──► sleep(delay)          (poll interval)
//! tick body Err ──► sleep(error_backoff)
//! ```
//!
//! A resolver `Failure` is part of the outcome and does not count as a tick
//! body error.

use crate::config::{MonitorSettings, QuerySettings};
use crate::error::Result;
use crate::shutdown::ShutdownSignal;
use crate::traits::{FailureReason, ResolutionOutcome, Resolver, UNKNOWN_ADDRESS};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry strategy parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempt limit; `None` means unbounded
    max_attempts: Option<usize>,

    /// Sleep after a failed attempt (bounded) or a normal tick (unbounded)
    delay: Duration,

    /// Sleep after a tick body error (unbounded only)
    error_backoff: Duration,

    /// Per-call resolver timeout
    timeout: Duration,
}

impl RetryPolicy {
    /// Create a bounded policy
    ///
    /// At least one attempt is always made, so `max_attempts` of 0 is raised to 1.
    pub fn bounded(max_attempts: usize, delay: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            delay,
            error_backoff: delay,
            timeout,
        }
    }

    /// Create an unbounded policy
    pub fn unbounded(poll_interval: Duration, error_backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: None,
            delay: poll_interval,
            error_backoff,
            timeout,
        }
    }

    /// Bounded policy with the default interactive parameters (3 attempts, 1s, 5s timeout)
    pub fn interactive() -> Self {
        Self::from(&QuerySettings::default())
    }

    /// Unbounded policy with the default background parameters (5min, 5s backoff, 10s timeout)
    pub fn background() -> Self {
        Self::from(&MonitorSettings::default())
    }

    /// Attempt limit, if bounded
    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }

    /// Delay between attempts / poll interval
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep after a tick body error
    pub fn error_backoff(&self) -> Duration {
        self.error_backoff
    }

    /// Per-call resolver timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a fresh per-invocation context
    pub fn context(&self) -> RetryContext {
        RetryContext {
            attempts_made: 0,
            max_attempts: self.max_attempts,
            delay: self.delay,
        }
    }

    /// Resolve until an attempt succeeds or the attempt limit is reached
    ///
    /// `on_failure` is called once per failed attempt with the 1-based attempt
    /// number. No delay follows the final attempt.
    ///
    /// An unbounded policy retries here until an attempt succeeds.
    pub async fn run_bounded<F>(&self, resolver: &dyn Resolver, mut on_failure: F) -> BoundedOutcome
    where
        F: FnMut(usize, &FailureReason) + Send,
    {
        let mut ctx = self.context();

        loop {
            let attempt = ctx.begin_attempt();

            match resolver.resolve(self.timeout).await {
                ResolutionOutcome::Success { address } => {
                    debug!("{} resolved {} on attempt {}", resolver.name(), address, attempt);
                    return BoundedOutcome {
                        address,
                        exhausted: false,
                        attempts: attempt,
                    };
                }
                ResolutionOutcome::Failure(reason) => {
                    debug!("{} attempt {} failed: {}", resolver.name(), attempt, reason);
                    on_failure(attempt, &reason);
                }
            }

            if ctx.is_exhausted() {
                return BoundedOutcome {
                    address: UNKNOWN_ADDRESS.to_string(),
                    exhausted: true,
                    attempts: attempt,
                };
            }

            tokio::time::sleep(ctx.delay()).await;
        }
    }

    /// Tick until `shutdown` fires
    ///
    /// Every suspension point (resolution, handler, sleep) is raced against
    /// the shutdown signal. Returns the number of completed ticks.
    pub async fn run_forever(
        &self,
        resolver: &dyn Resolver,
        handler: &mut dyn TickHandler,
        shutdown: &mut ShutdownSignal,
    ) -> usize {
        let mut ctx = self.context();

        loop {
            if shutdown.is_stopped() {
                break;
            }

            let tick = async {
                let outcome = resolver.resolve(self.timeout).await;
                handler.on_tick(outcome).await
            };

            let result = tokio::select! {
                biased;
                _ = shutdown.stopped() => break,
                result = tick => result,
            };
            let tick_number = ctx.begin_attempt();

            let sleep_for = match result {
                Ok(()) => ctx.delay(),
                Err(e) => {
                    warn!("Tick {} failed: {}, backing off for {:?}", tick_number, e, self.error_backoff);
                    self.error_backoff
                }
            };
            debug!("Tick {} complete, next tick in {:?}", tick_number, sleep_for);

            tokio::select! {
                biased;
                _ = shutdown.stopped() => break,
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }

        ctx.attempts_made()
    }
}

impl From<&QuerySettings> for RetryPolicy {
    fn from(settings: &QuerySettings) -> Self {
        Self::bounded(settings.max_attempts, settings.retry_delay(), settings.timeout())
    }
}

impl From<&MonitorSettings> for RetryPolicy {
    fn from(settings: &MonitorSettings) -> Self {
        Self::unbounded(
            settings.poll_interval(),
            settings.error_backoff(),
            settings.timeout(),
        )
    }
}

/// Ephemeral per-invocation retry state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryContext {
    attempts_made: usize,
    max_attempts: Option<usize>,
    delay: Duration,
}

impl RetryContext {
    /// Count a new attempt and return its 1-based number
    pub fn begin_attempt(&mut self) -> usize {
        self.attempts_made += 1;
        self.attempts_made
    }

    /// Attempts counted so far
    pub fn attempts_made(&self) -> usize {
        self.attempts_made
    }

    /// Whether no further attempts are allowed
    pub fn is_exhausted(&self) -> bool {
        self.max_attempts
            .is_some_and(|max| self.attempts_made >= max)
    }

    /// Delay before the next attempt
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Result of [`RetryPolicy::run_bounded`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedOutcome {
    /// Resolved address, or [`UNKNOWN_ADDRESS`] when exhausted
    pub address: String,
    /// Whether every attempt failed
    pub exhausted: bool,
    /// Attempts made
    pub attempts: usize,
}

/// Receives each outcome of the unbounded loop
///
/// Returning an error makes the loop sleep for the policy's error backoff
/// instead of its poll interval. The loop itself keeps running.
#[async_trait]
pub trait TickHandler: Send {
    /// Handle one resolution outcome
    async fn on_tick(&mut self, outcome: ResolutionOutcome) -> Result<()>;
}
