//! Error types for the stepwise reporting core.
//!
//! Only [`ProtocolViolationError`] is ever handed back to a test runner. Listener
//! failures and history-store outages are caught where they happen and degraded
//! into log records, because a report must still be produced from partial data.

use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for stepwise operations.
#[derive(Debug, Error)]
pub enum StepwiseError {
    /// An inbound event arrived in a state that does not permit it.
    #[error("{0}")]
    ProtocolViolation(#[from] ProtocolViolationError),

    /// A listener callback failed during dispatch.
    #[error("{0}")]
    ListenerFailure(#[from] ListenerFailure),

    /// The historical run store could not serve a request.
    #[error("{0}")]
    History(#[from] HistoryError),

    /// The configuration was rejected.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl StepwiseError {
    /// Returns true if the caller is expected to act on this error.
    ///
    /// Everything except a protocol violation is degraded internally.
    #[must_use]
    pub fn is_caller_actionable(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }
}

/// Raised when an event is delivered in a bus state that does not accept it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Protocol violation: '{event}' is not allowed while {state}: {message}")]
pub struct ProtocolViolationError {
    /// The offending event name (e.g. `step_started`).
    pub event: String,
    /// The bus state at the time of delivery.
    pub state: String,
    /// What was wrong.
    pub message: String,
}

impl ProtocolViolationError {
    /// Creates a new protocol violation.
    #[must_use]
    pub fn new(
        event: impl Into<String>,
        state: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event: event.into(),
            state: state.into(),
            message: message.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), json!("ProtocolViolation"));
        map.insert("event".to_string(), json!(self.event));
        map.insert("state".to_string(), json!(self.state));
        map.insert("message".to_string(), json!(self.message));
        map
    }
}

/// A listener raised an error or panicked while receiving a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Listener '{listener}' failed on '{event}': {message}")]
pub struct ListenerFailure {
    /// Name of the failing listener.
    pub listener: String,
    /// The notification being delivered.
    pub event: String,
    /// The outcome being processed, if any.
    pub test: Option<String>,
    /// The error or panic message.
    pub message: String,
}

impl ListenerFailure {
    /// Creates a new listener failure record.
    #[must_use]
    pub fn new(
        listener: impl Into<String>,
        event: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            listener: listener.into(),
            event: event.into(),
            test: None,
            message: message.into(),
        }
    }

    /// Sets the test whose outcome was being processed.
    #[must_use]
    pub fn with_test(mut self, test: impl Into<String>) -> Self {
        self.test = Some(test.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), json!("ListenerFailure"));
        map.insert("listener".to_string(), json!(self.listener));
        map.insert("event".to_string(), json!(self.event));
        if let Some(ref test) = self.test {
            map.insert("test".to_string(), json!(test));
        }
        map.insert("message".to_string(), json!(self.message));
        map
    }
}

/// Errors raised by a historical run store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The store could not be reached.
    #[error("History unavailable: {reason}")]
    Unavailable {
        /// Why the store is unavailable.
        reason: String,
    },

    /// The store returned data that could not be interpreted.
    #[error("History corrupt: {reason}")]
    Corrupt {
        /// What was wrong with the data.
        reason: String,
    },
}

impl HistoryError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a corrupt data error.
    #[must_use]
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }
}

/// Error raised when configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration for '{field}': {message}")]
pub struct ConfigError {
    /// The offending field.
    pub field: String,
    /// What was wrong.
    pub message: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
