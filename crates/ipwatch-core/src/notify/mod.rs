//! Notification dispatch
//!
//! [`NotificationDispatcher`] pairs a [`Notifier`] with the single configured
//! [`NotificationTarget`]. It makes one delivery attempt per message and
//! hands any failure back to the caller.

mod log;

pub use log::LogNotifier;

use crate::config::TargetConfig;
use crate::error::{Error, Result};
use crate::traits::{NotificationTarget, Notifier};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

impl NotificationTarget {
    /// Load the target described by `config`
    ///
    /// A missing file or an empty value is a configuration error.
    pub async fn load(config: &TargetConfig) -> Result<Self> {
        match config {
            TargetConfig::Inline { id } => Self::new(id),
            TargetConfig::File { path } => Self::from_file(path).await,
        }
    }

    /// Read the target from a file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!(
                "Failed to read notification target from {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::new(&contents).map_err(|_| {
            Error::config(format!(
                "Notification target file {} is empty",
                path.display()
            ))
        })
    }
}

/// Sends messages to the configured recipient
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    target: NotificationTarget,
}

impl NotificationDispatcher {
    /// Create a dispatcher for `target`
    pub fn new(notifier: Arc<dyn Notifier>, target: NotificationTarget) -> Self {
        Self { notifier, target }
    }

    /// The configured recipient
    pub fn target(&self) -> &NotificationTarget {
        &self.target
    }

    /// Deliver `text` once
    pub async fn dispatch(&self, text: &str) -> Result<()> {
        debug!(
            "Dispatching notification via {} to {}",
            self.notifier.notifier_name(),
            self.target
        );
        self.notifier.notify(&self.target, text).await
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("notifier", &self.notifier.notifier_name())
            .field("target", &self.target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn notify(&self, target: &NotificationTarget, text: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((target.to_string(), text.to_string()));
            Ok(())
        }

        fn notifier_name(&self) -> &'static str {
            "capturing"
        }
    }

    #[tokio::test]
    async fn dispatch_uses_configured_target() {
        let notifier = Arc::new(CapturingNotifier::default());
        let dispatcher = NotificationDispatcher::new(
            notifier.clone(),
            NotificationTarget::new("ops-channel").unwrap(),
        );

        dispatcher.dispatch("hello").await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("ops-channel".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn loads_inline_target() {
        let config = TargetConfig::Inline {
            id: "987654321".to_string(),
        };
        let target = NotificationTarget::load(&config).await.unwrap();
        assert_eq!(target.as_str(), "987654321");
    }

    #[tokio::test]
    async fn loads_trimmed_target_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  987654321  ").unwrap();

        let config = TargetConfig::File {
            path: file.path().to_string_lossy().into_owned(),
        };
        let target = NotificationTarget::load(&config).await.unwrap();
        assert_eq!(target.as_str(), "987654321");
    }

    #[tokio::test]
    async fn empty_target_file_is_a_config_error() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let err = NotificationTarget::from_file(file.path()).await.unwrap_err();
        assert!(err.is_config(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn missing_target_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("target");

        let err = NotificationTarget::from_file(&missing).await.unwrap_err();
        assert!(err.is_config(), "unexpected error: {err}");
    }
}
