//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that script resolver outcomes
//! and record notifications without touching the network.

#![allow(dead_code)]

use ipwatch_core::config::MonitorSettings;
use ipwatch_core::{
    Error, IpMonitor, MonitorEvent, NotificationTarget, Notifier, ResolutionOutcome, Resolver,
    Result,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const ADDR_A: &str = "2001:db8::1";
pub const ADDR_B: &str = "2001:db8::2";

/// One scripted resolver step
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this outcome immediately
    Outcome(ResolutionOutcome),
    /// Never return (an in-flight lookup)
    Hang,
}

/// A resolver that replays a script, then repeats a fallback outcome
pub struct ScriptedResolver {
    script: Mutex<VecDeque<Step>>,
    fallback: ResolutionOutcome,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl ScriptedResolver {
    pub fn new(script: Vec<Step>, fallback: ResolutionOutcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
        })
    }

    /// Always return the same outcome
    pub fn constant(outcome: ResolutionOutcome) -> Arc<Self> {
        Self::new(Vec::new(), outcome)
    }

    /// Replay `outcomes`, then repeat the last one
    pub fn sequence(outcomes: Vec<ResolutionOutcome>) -> Arc<Self> {
        let fallback = outcomes
            .last()
            .cloned()
            .unwrap_or_else(|| ResolutionOutcome::success(ADDR_A));
        Self::new(outcomes.into_iter().map(Step::Outcome).collect(), fallback)
    }

    /// Number of resolve() calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// When each resolve() call started
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    /// Timeouts passed to each resolve() call
    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(&self, timeout: Duration) -> ResolutionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        self.timeouts.lock().unwrap().push(timeout);

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Outcome(outcome)) => outcome,
            Some(Step::Hang) => std::future::pending().await,
            None => self.fallback.clone(),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A notifier that records every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    /// Deliveries with index >= this fail (usize::MAX = never)
    fail_from: AtomicUsize,
    hang: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_from: AtomicUsize::new(usize::MAX),
            ..Default::default()
        })
    }

    /// Fail every delivery attempt starting at zero-based index `index`
    pub fn failing_from(index: usize) -> Arc<Self> {
        let notifier = Self::new();
        notifier.fail_from.store(index, Ordering::SeqCst);
        notifier
    }

    /// Never complete any delivery
    pub fn hanging() -> Arc<Self> {
        let notifier = Self::new();
        notifier.hang.store(true, Ordering::SeqCst);
        notifier
    }

    /// Successfully delivered (target, text) pairs
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    /// Successfully delivered texts
    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }

    /// Delivery attempts, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, target: &NotificationTarget, text: &str) -> Result<()> {
        let index = self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if index >= self.fail_from.load(Ordering::SeqCst) {
            return Err(Error::notification("recipient unreachable"));
        }

        self.messages
            .lock()
            .unwrap()
            .push((target.to_string(), text.to_string()));
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// Recipient used by every test
pub fn test_target() -> NotificationTarget {
    NotificationTarget::new("ops-channel").expect("valid target")
}

/// Build a monitor with default settings
pub fn monitor(
    resolver: Arc<ScriptedResolver>,
    notifier: Arc<RecordingNotifier>,
) -> (IpMonitor, mpsc::Receiver<MonitorEvent>) {
    IpMonitor::new(resolver, notifier, test_target(), &MonitorSettings::default())
        .expect("monitor construction succeeds")
}

/// Receive events until one matches `pred`, returning it
pub async fn wait_for_event<F>(rx: &mut mpsc::Receiver<MonitorEvent>, mut pred: F) -> MonitorEvent
where
    F: FnMut(&MonitorEvent) -> bool,
{
    loop {
        let event = rx.recv().await.expect("event channel open");
        if pred(&event) {
            return event;
        }
    }
}

/// Wait until the resolver has been called at least `n` times
pub async fn wait_for_calls(resolver: &ScriptedResolver, n: usize) {
    while resolver.calls() < n {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

/// Assert `later - earlier` equals `expected` (within timer granularity)
pub fn assert_gap(earlier: Instant, later: Instant, expected: Duration) {
    let gap = later - earlier;
    assert!(
        gap >= expected && gap < expected + Duration::from_millis(500),
        "expected a gap of {:?}, got {:?}",
        expected,
        gap
    );
}
