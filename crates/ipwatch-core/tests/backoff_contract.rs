//! Contract Test: Background Schedule and Error Backoff
//!
//! This test verifies the sleep selection of the unbounded loop.
//!
//! Constraints verified:
//! - A normal tick is followed by the poll interval
//! - A tick whose body fails is followed by the error backoff
//! - A resolver failure is a normal tick (no shortened sleep)
//! - A failing tick never ends the loop
//! - The background timeout is passed to every resolver call

mod common;

use async_trait::async_trait;
use common::*;
use ipwatch_core::{
    Error, MonitorEvent, ResolutionOutcome, RetryPolicy, ShutdownTrigger, TickHandler,
    shutdown_channel,
};
use std::time::Duration;
use tokio::time::Instant;

const POLL: Duration = Duration::from_secs(300);
const BACKOFF: Duration = Duration::from_secs(5);

/// Records tick times, fails selected ticks, stops after `stop_after` ticks
struct ScriptedHandler {
    fail_ticks: Vec<usize>,
    stop_after: usize,
    ticks: Vec<Instant>,
    outcomes: Vec<ResolutionOutcome>,
    trigger: ShutdownTrigger,
}

#[async_trait]
impl TickHandler for ScriptedHandler {
    async fn on_tick(&mut self, outcome: ResolutionOutcome) -> ipwatch_core::Result<()> {
        self.ticks.push(Instant::now());
        self.outcomes.push(outcome);
        let tick = self.ticks.len();

        if tick >= self.stop_after {
            self.trigger.trigger();
        }

        if self.fail_ticks.contains(&tick) {
            return Err(Error::Other(format!("tick {} exploded", tick)));
        }
        Ok(())
    }
}

async fn run_ticks(
    resolver: std::sync::Arc<ScriptedResolver>,
    fail_ticks: Vec<usize>,
    stop_after: usize,
) -> (usize, ScriptedHandler) {
    let (trigger, mut signal) = shutdown_channel();
    let mut handler = ScriptedHandler {
        fail_ticks,
        stop_after,
        ticks: Vec::new(),
        outcomes: Vec::new(),
        trigger,
    };

    let completed = RetryPolicy::background()
        .run_forever(resolver.as_ref(), &mut handler, &mut signal)
        .await;

    (completed, handler)
}

#[tokio::test(start_paused = true)]
async fn normal_ticks_sleep_for_poll_interval() {
    let resolver = ScriptedResolver::constant(ResolutionOutcome::success(ADDR_A));

    let (completed, handler) = run_ticks(resolver, vec![], 3).await;

    assert_eq!(completed, 3);
    assert_gap(handler.ticks[0], handler.ticks[1], POLL);
    assert_gap(handler.ticks[1], handler.ticks[2], POLL);
}

#[tokio::test(start_paused = true)]
async fn failing_tick_sleeps_for_error_backoff() {
    let resolver = ScriptedResolver::constant(ResolutionOutcome::success(ADDR_A));

    let (completed, handler) = run_ticks(resolver, vec![1], 3).await;

    assert_eq!(completed, 3, "a failing tick does not end the loop");
    assert_gap(handler.ticks[0], handler.ticks[1], BACKOFF);
    assert_gap(handler.ticks[1], handler.ticks[2], POLL);
}

#[tokio::test(start_paused = true)]
async fn repeated_failing_ticks_keep_backing_off() {
    let resolver = ScriptedResolver::constant(ResolutionOutcome::success(ADDR_A));

    let (completed, handler) = run_ticks(resolver, vec![1, 2, 3], 4).await;

    assert_eq!(completed, 4);
    for pair in handler.ticks.windows(2) {
        assert_gap(pair[0], pair[1], BACKOFF);
    }
}

#[tokio::test(start_paused = true)]
async fn resolver_failure_does_not_shorten_sleep() {
    let resolver = ScriptedResolver::constant(ResolutionOutcome::timeout());

    let (_, handler) = run_ticks(resolver, vec![], 2).await;

    assert!(handler.outcomes.iter().all(ResolutionOutcome::is_failure));
    assert_gap(handler.ticks[0], handler.ticks[1], POLL);
}

#[tokio::test(start_paused = true)]
async fn background_timeout_is_passed_to_resolver() {
    let resolver = ScriptedResolver::constant(ResolutionOutcome::success(ADDR_A));

    run_ticks(resolver.clone(), vec![], 2).await;

    assert_eq!(resolver.timeouts(), vec![Duration::from_secs(10); 2]);
}

#[tokio::test(start_paused = true)]
async fn failed_change_notification_triggers_backoff() {
    // Startup notification (index 0) succeeds; every later delivery fails.
    let resolver = ScriptedResolver::sequence(vec![
        ResolutionOutcome::success(ADDR_A),
        ResolutionOutcome::success(ADDR_B),
    ]);
    let notifier = RecordingNotifier::failing_from(1);
    let (monitor, mut events) = monitor(resolver.clone(), notifier.clone());

    let handle = monitor.spawn();

    wait_for_event(&mut events, |e| matches!(e, MonitorEvent::NotificationFailed { .. })).await;
    wait_for_calls(&resolver, 4).await;
    handle.shutdown().await.expect("monitor keeps running after delivery failure");

    let times = resolver.call_times();
    assert_gap(times[0], times[1], POLL);
    assert_gap(times[1], times[2], BACKOFF);
    assert_gap(times[2], times[3], POLL);

    // The failed transition is not announced again on the following ticks.
    assert_eq!(notifier.attempts(), 2);
}
