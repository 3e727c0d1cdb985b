//! Background address monitor
//!
//! The [`IpMonitor`] is responsible for:
//! - Announcing that monitoring has started
//! - Resolving the public address on a fixed schedule
//! - Detecting genuine address transitions
//! - Notifying the configured recipient of each transition
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Resolver   │─── ResolutionOutcome ───┐
//! └─────────────┘                         │
//!                                         ▼
//!                              ┌────────────────────┐
//!                              │ RetryPolicy        │
//!                              │ (run_forever)      │
//!                              └────────────────────┘
//!                                         │
//!             ┌───────────────────────────┼───────────────────────────┐
//!             │                           │                           │
//!             ▼                           ▼                           ▼
//!   ┌─────────────────┐       ┌──────────────────────┐       ┌─────────────┐
//!   │ ChangeDetector  │──────►│ NotificationDispatch │       │   Events    │
//!   │ (AddressState)  │       │ (one recipient)      │       │  (observe)  │
//!   └─────────────────┘       └──────────────────────┘       └─────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Starting ──► Running ──► Terminated
//!     │                        ▲
//!     └────── shutdown ────────┘
//! ```
//!
//! `Terminated` is reached only through the shutdown signal. After it is
//! observed no further notifications are sent.

mod watcher;

use crate::config::{MonitorSettings, WatchConfig};
use crate::error::{Error, Result};
use crate::notify::NotificationDispatcher;
use crate::retry::RetryPolicy;
use crate::shutdown::{ShutdownSignal, ShutdownTrigger, shutdown_channel};
use crate::traits::{FailureReason, NotificationTarget, Notifier, Resolver};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use watcher::AddressWatcher;

/// Text of the one-time startup notification
pub const STARTUP_MESSAGE: &str = "Public address monitor started";

/// Events emitted by the IpMonitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Monitor entered the running phase
    Started {
        target: String,
    },

    /// First successful resolution stored (not a transition)
    Seeded {
        address: String,
    },

    /// Known address changed
    AddressChanged {
        old: String,
        new: String,
    },

    /// Resolution matched the known address
    Unchanged {
        address: String,
    },

    /// Resolver reported a failure
    ResolveFailed {
        reason: FailureReason,
    },

    /// A notification could not be delivered
    NotificationFailed {
        error: String,
    },

    /// Monitor terminated
    Stopped {
        reason: String,
        ticks: usize,
    },
}

/// Monitor lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Sending the startup notification
    Starting,
    /// Ticking
    Running,
    /// Stopped by the shutdown signal
    Terminated,
}

/// Bounded, non-blocking event publisher
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<MonitorEvent>,
}

impl EventSink {
    fn new(capacity: usize) -> (Self, mpsc::Receiver<MonitorEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub(crate) fn emit(&self, event: MonitorEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            // Nobody is listening; events are optional.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
        }
    }
}

/// Background address monitor
///
/// Owns the single [`AddressState`](crate::state::AddressState). Ticks are
/// strictly sequential, so transitions are observed and notified in order.
pub struct IpMonitor {
    /// Resolver shared with interactive queries
    resolver: Arc<dyn Resolver>,

    /// Unbounded schedule
    policy: RetryPolicy,

    /// Detection and dispatch for each tick
    watcher: AddressWatcher,

    /// Recipient for the startup notification
    dispatcher: NotificationDispatcher,

    /// Event publisher
    events: EventSink,

    /// Current lifecycle phase
    phase: watch::Sender<MonitorPhase>,
}

impl IpMonitor {
    /// Create a monitor
    ///
    /// # Returns
    ///
    /// A tuple of (monitor, event_receiver) where event_receiver yields monitor events
    pub fn new(
        resolver: Arc<dyn Resolver>,
        notifier: Arc<dyn Notifier>,
        target: NotificationTarget,
        settings: &MonitorSettings,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        settings.validate()?;

        let (events, rx) = EventSink::new(settings.event_channel_capacity);
        let dispatcher = NotificationDispatcher::new(notifier, target);
        let (phase, _) = watch::channel(MonitorPhase::Starting);

        let monitor = Self {
            resolver,
            policy: RetryPolicy::from(settings),
            watcher: AddressWatcher::new(dispatcher.clone(), events.clone()),
            dispatcher,
            events,
            phase,
        };

        Ok((monitor, rx))
    }

    /// Create a monitor from configuration, loading the notification target
    ///
    /// A missing or empty target aborts construction with a configuration error.
    pub async fn from_config(
        config: &WatchConfig,
        resolver: Arc<dyn Resolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        let target = NotificationTarget::load(&config.target).await?;
        Self::new(resolver, notifier, target, &config.monitor)
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> MonitorPhase {
        *self.phase.borrow()
    }

    /// Watch lifecycle phase changes
    pub fn subscribe_phase(&self) -> watch::Receiver<MonitorPhase> {
        self.phase.subscribe()
    }

    /// Run until `shutdown` fires
    pub async fn run_with_shutdown(mut self, mut shutdown: ShutdownSignal) -> Result<()> {
        info!(
            "Starting address monitor (poll interval {:?}, recipient {})",
            self.policy.delay(),
            self.dispatcher.target()
        );

        let startup = tokio::select! {
            biased;
            _ = shutdown.stopped() => None,
            result = self.dispatcher.dispatch(STARTUP_MESSAGE) => Some(result),
        };

        match startup {
            None => {
                self.terminate("Shutdown during startup", 0);
                return Ok(());
            }
            Some(Err(e)) => {
                warn!("Failed to deliver startup notification: {}", e);
                self.events.emit(MonitorEvent::NotificationFailed {
                    error: e.to_string(),
                });
            }
            Some(Ok(())) => {}
        }

        self.phase.send_replace(MonitorPhase::Running);
        self.events.emit(MonitorEvent::Started {
            target: self.dispatcher.target().to_string(),
        });

        let ticks = self
            .policy
            .run_forever(self.resolver.as_ref(), &mut self.watcher, &mut shutdown)
            .await;

        self.terminate("Shutdown signal", ticks);
        Ok(())
    }

    /// Spawn the monitor onto the current runtime
    pub fn spawn(self) -> MonitorHandle {
        let (trigger, signal) = shutdown_channel();
        let phase = self.subscribe_phase();
        let task = tokio::spawn(self.run_with_shutdown(signal));

        MonitorHandle {
            trigger,
            phase,
            task,
        }
    }

    fn terminate(&self, reason: &str, ticks: usize) {
        info!("Address monitor stopped after {} tick(s): {}", ticks, reason);
        self.phase.send_replace(MonitorPhase::Terminated);
        self.events.emit(MonitorEvent::Stopped {
            reason: reason.to_string(),
            ticks,
        });
    }
}

/// Handle to a spawned [`IpMonitor`]
///
/// Dropping the handle stops the monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    trigger: ShutdownTrigger,
    phase: watch::Receiver<MonitorPhase>,
    task: JoinHandle<Result<()>>,
}

impl MonitorHandle {
    /// Current lifecycle phase
    pub fn phase(&self) -> MonitorPhase {
        *self.phase.borrow()
    }

    /// Wait until the monitor reaches `phase`
    ///
    /// Returns `false` if the monitor ended without reaching it.
    pub async fn wait_for_phase(&mut self, phase: MonitorPhase) -> bool {
        self.phase.wait_for(|current| *current == phase).await.is_ok()
    }

    /// Request termination (idempotent)
    pub fn stop(&self) {
        self.trigger.trigger();
    }

    /// Whether the monitor task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the monitor task to exit
    pub async fn join(self) -> Result<()> {
        let Self { trigger, task, .. } = self;
        let result = task
            .await
            .map_err(|e| Error::Other(format!("Monitor task failed: {}", e)));
        drop(trigger);
        result?
    }

    /// Request termination and wait for the task to exit
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.join().await
    }
}
