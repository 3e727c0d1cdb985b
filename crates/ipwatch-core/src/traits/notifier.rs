// # Notifier Trait
//
// Defines the interface for delivering a text message to a recipient.
//
// ## Implementations
//
// - Log: `ipwatch_core::notify::LogNotifier`
// - Webhook: `ipwatch-notify-webhook` crate

use async_trait::async_trait;
use std::fmt;

/// Opaque recipient identifier
///
/// Loaded once at startup and immutable afterwards. Construction rejects
/// empty identifiers, so a value of this type is always usable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationTarget(String);

impl NotificationTarget {
    /// Create a target from an identifier (surrounding whitespace trimmed)
    pub fn new(id: impl AsRef<str>) -> Result<Self, crate::Error> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(crate::Error::config("Notification target cannot be empty"));
        }
        Ok(Self(id.to_string()))
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for notification collaborators
///
/// Implementations make a single delivery attempt. They must not retry,
/// spawn tasks or cache state; the caller decides what a failure means.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to `target`
    async fn notify(&self, target: &NotificationTarget, text: &str) -> Result<(), crate::Error>;

    /// Short name used in logs
    fn notifier_name(&self) -> &'static str;
}
