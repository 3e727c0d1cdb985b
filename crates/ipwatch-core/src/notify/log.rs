// # Log Notifier
//
// Writes notifications to the tracing log instead of a messaging surface.
// Used when no external collaborator is configured, and in local testing.

use async_trait::async_trait;
use tracing::info;

use crate::traits::{NotificationTarget, Notifier};

/// Notifier that logs every message at `info` level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a log notifier
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, target: &NotificationTarget, text: &str) -> Result<(), crate::Error> {
        info!(recipient = %target, "{}", text);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "log"
    }
}
