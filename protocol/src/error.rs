//! Structured failure value transported across the process boundary.
//!
//! The source relies on pickle being able to serialize an arbitrary raised
//! exception; a systems-language implementation can't assume that richly
//! reflective an encoding, so failures are carried as this explicit value
//! instead (Design Notes §9, "Exceptions transported as values").

use serde::{Deserialize, Serialize};

/// A caller-visible worker failure, transported inside an `EXCEPTION`
/// packet in either direction (auth failures parent→child, callable
/// failures child→parent).
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct WorkerFailure {
    /// A short machine-readable failure category, e.g. `"value_error"`,
    /// `"unknown_callable"`, `"authentication"`.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
    /// Optional stack trace or similar diagnostic, if the side that raised
    /// it could produce one.
    pub stack: Option<String>,
}

impl WorkerFailure {
    /// Build a failure with no stack trace attached.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// An authentication failure (wrong cookie or unknown identity).
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new("authentication", message)
    }

    /// A protocol violation (unexpected packet type, malformed frame).
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new("protocol", message)
    }
}
