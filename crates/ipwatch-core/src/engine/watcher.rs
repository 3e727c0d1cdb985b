//! Tick handler wiring detection to dispatch
//!
//! For every outcome of the background loop:
//!
//! 1. Failures are reported as events and otherwise ignored
//! 2. Successes go through the [`ChangeDetector`]
//! 3. A [`Transition`](crate::state::Transition) is dispatched once
//!
//! A failed dispatch is returned as the tick's error so the loop backs off.
//! The state has already moved to the new address by then, so the same
//! transition is not announced twice.

use super::{EventSink, MonitorEvent};
use crate::error::Result;
use crate::notify::NotificationDispatcher;
use crate::retry::TickHandler;
use crate::state::{AddressState, ChangeDetector};
use crate::traits::ResolutionOutcome;
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub(crate) struct AddressWatcher {
    detector: ChangeDetector,
    state: AddressState,
    dispatcher: NotificationDispatcher,
    events: EventSink,
}

impl AddressWatcher {
    pub(crate) fn new(dispatcher: NotificationDispatcher, events: EventSink) -> Self {
        Self {
            detector: ChangeDetector::new(),
            state: AddressState::new(),
            dispatcher,
            events,
        }
    }
}

#[async_trait]
impl TickHandler for AddressWatcher {
    async fn on_tick(&mut self, outcome: ResolutionOutcome) -> Result<()> {
        if let ResolutionOutcome::Failure(reason) = &outcome {
            warn!("Address lookup failed: {}", reason);
            self.events.emit(MonitorEvent::ResolveFailed {
                reason: reason.clone(),
            });
            return Ok(());
        }

        let was_known = self.state.is_known();
        let Some(transition) = self.detector.observe(&outcome, &mut self.state) else {
            if was_known {
                debug!("Address unchanged: {}", self.state.value());
                self.events.emit(MonitorEvent::Unchanged {
                    address: self.state.value().to_string(),
                });
            } else {
                info!("Initial address: {}", self.state.value());
                self.events.emit(MonitorEvent::Seeded {
                    address: self.state.value().to_string(),
                });
            }
            return Ok(());
        };

        info!("Address changed: {} -> {}", transition.old, transition.new);
        self.events.emit(MonitorEvent::AddressChanged {
            old: transition.old.clone(),
            new: transition.new.clone(),
        });

        if let Err(e) = self.dispatcher.dispatch(&transition.message()).await {
            warn!("Failed to deliver change notification: {}", e);
            self.events.emit(MonitorEvent::NotificationFailed {
                error: e.to_string(),
            });
            return Err(e);
        }

        Ok(())
    }
}
