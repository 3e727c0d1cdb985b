//! Cooperative cancellation
//!
//! A [`ShutdownTrigger`] flips a shared flag once; every [`ShutdownSignal`]
//! cloned from the same channel observes it. Waiting on a signal that has
//! already fired returns immediately, so the same signal can guard every
//! suspension point of a loop.

use tokio::sync::watch;

/// Create a connected trigger/signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger(tx), ShutdownSignal(rx))
}

/// Sending half: requests shutdown
///
/// Dropping the trigger counts as a shutdown request.
#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    /// Request shutdown (idempotent)
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }

    /// Create another signal observing this trigger
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal(self.0.subscribe())
    }
}

/// Receiving half: observed by long-running loops
#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    /// Whether shutdown has been requested
    pub fn is_stopped(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }

    /// Wait until shutdown is requested
    pub async fn stopped(&mut self) {
        // Err means the trigger was dropped, which also means stop.
        let _ = self.0.wait_for(|stopped| *stopped).await;
    }
}
