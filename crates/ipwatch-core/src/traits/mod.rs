//! Core traits for the ipwatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Resolver`]: Look up the current public address
//! - [`Notifier`]: Deliver a message to the configured recipient

pub mod resolver;
pub mod notifier;

pub use resolver::{Resolver, ResolutionOutcome, FailureReason, UNKNOWN_ADDRESS};
pub use notifier::{Notifier, NotificationTarget};
