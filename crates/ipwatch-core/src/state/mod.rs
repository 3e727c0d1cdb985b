// # Address State
//
// The single last-known-good public address and the detector that decides
// when a fresh resolution is a genuine change.
//
// ## Seeding
//
// The first successful resolution after startup has nothing to be compared
// against. It seeds the state and is not reported. Only a change from one
// known value to a different one produces a [`Transition`].
//
// ```text
// known=false ── Success(a) ──► known=true, value=a          (no transition)
// known=true  ── Success(a) ──► unchanged                    (no transition)
// known=true  ── Success(b) ──► value=b                      Transition{a, b}
// any         ── Failure    ──► unchanged                    (no transition)
// ```

use crate::traits::{ResolutionOutcome, UNKNOWN_ADDRESS};
use chrono::{DateTime, Utc};

/// Last-known-good address
///
/// Owned exclusively by the monitor. Once `known` becomes true it never
/// reverts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressState {
    value: String,
    known: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl AddressState {
    /// Create an unknown state
    pub fn new() -> Self {
        Self {
            value: UNKNOWN_ADDRESS.to_string(),
            known: false,
            updated_at: None,
        }
    }

    /// Create a state that already holds a known value
    pub fn known(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            known: true,
            updated_at: Some(Utc::now()),
        }
    }

    /// Current value ([`UNKNOWN_ADDRESS`] until seeded)
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether a successful resolution has been observed
    pub fn is_known(&self) -> bool {
        self.known
    }

    /// When the value last changed
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Store a new value and return the previous one
    fn replace(&mut self, value: &str) -> String {
        self.known = true;
        self.updated_at = Some(Utc::now());
        std::mem::replace(&mut self.value, value.to_string())
    }
}

impl Default for AddressState {
    fn default() -> Self {
        Self::new()
    }
}

/// A change from one known address to a different one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Previous address
    pub old: String,
    /// New address
    pub new: String,
    /// When the change was observed
    pub observed_at: DateTime<Utc>,
}

impl Transition {
    /// Notification text for this transition
    pub fn message(&self) -> String {
        format!("Public address changed: {} -> {}", self.old, self.new)
    }
}

/// Decides whether an outcome is a genuine transition
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    /// Create a detector
    pub fn new() -> Self {
        Self
    }

    /// Apply `outcome` to `state`
    ///
    /// Returns a [`Transition`] only when a known value changes. The first
    /// success seeds `state` silently; failures leave it untouched.
    pub fn observe(&self, outcome: &ResolutionOutcome, state: &mut AddressState) -> Option<Transition> {
        let ResolutionOutcome::Success { address } = outcome else {
            return None;
        };

        if !state.known {
            state.replace(address);
            return None;
        }

        if state.value == *address {
            return None;
        }

        let old = state.replace(address);
        Some(Transition {
            old,
            new: address.clone(),
            observed_at: state.updated_at.unwrap_or_else(Utc::now),
        })
    }
}
