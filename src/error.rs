//! Error types used by the emitter runtime and listeners.
//!
//! This module defines three error enums:
//!
//! - [`ListenerError`] — a failure raised by a single listener invocation.
//! - [`EmitError`] — the outcome surfaced on an emit's completion handle.
//! - [`EventError`] — a termination failure delivered through a stream or a
//!   one-shot event future.
//!
//! [`ListenerError`] provides helper methods (`as_label`, `as_message`) for
//! logging/metrics. Failures are local to the consumption mode that observed
//! them; none of them poison the emitter itself.

use std::any::Any;

use thiserror::Error;

/// Outcome of a single listener invocation.
pub type ListenerResult = Result<(), ListenerError>;

/// # Failure raised by one listener during a dispatch.
///
/// A listener can fail by returning `Err` or by panicking; panics are caught
/// per invocation and never take down the dispatch task or sibling listeners.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ListenerError {
    /// Listener returned an error.
    #[error("{message}")]
    Failed {
        /// The underlying error message.
        message: String,
    },

    /// Listener panicked while handling the event.
    #[error("listener panicked: {message}")]
    Panicked {
        /// The rendered panic payload.
        message: String,
    },
}

impl ListenerError {
    /// Builds a plain failure from any displayable reason.
    ///
    /// # Example
    /// ```
    /// use emitry::ListenerError;
    ///
    /// let err = ListenerError::failed("connection reset");
    /// assert_eq!(err.as_label(), "listener_failed");
    /// ```
    pub fn failed(message: impl Into<String>) -> Self {
        ListenerError::Failed {
            message: message.into(),
        }
    }

    /// Builds a panic failure from a caught panic payload.
    pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> Self {
        ListenerError::Panicked {
            message: panic_message(payload),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenerError::Failed { .. } => "listener_failed",
            ListenerError::Panicked { .. } => "listener_panicked",
        }
    }

    /// Returns a human-readable message with details about the failure.
    pub fn as_message(&self) -> String {
        match self {
            ListenerError::Failed { message } => format!("error: {message}"),
            ListenerError::Panicked { message } => format!("panic: {message}"),
        }
    }
}

/// # Outcome surfaced on an emit's completion handle.
///
/// A dispatch rejects with the first listener failure observed, in listener
/// order. Sibling listeners in the same dispatch still run to completion.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EmitError {
    /// At least one listener failed during this dispatch.
    #[error("dispatch of '{event}' failed: {source}")]
    ListenerFailed {
        /// Name of the emitted event.
        event: &'static str,
        /// The first listener failure, in listener order.
        source: ListenerError,
    },

    /// The dispatch task went away before settling this emit.
    ///
    /// Only reachable if the runtime tears the drain task down mid-flight;
    /// a normally completed dispatch always settles the handle.
    #[error("dispatch of '{event}' was abandoned before completion")]
    Abandoned {
        /// Name of the emitted event.
        event: &'static str,
    },
}

impl EmitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EmitError::ListenerFailed { .. } => "emit_listener_failed",
            EmitError::Abandoned { .. } => "emit_abandoned",
        }
    }
}

/// # Termination failure of a stream or one-shot event future.
///
/// Delivered exactly once per adapter: a stream yields it as its final item
/// before reporting exhaustion, a future settles with it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EventError {
    /// The configured error event fired; carries its rendered value.
    #[error("'{event}' signaled failure: {reason}")]
    Failure {
        /// Name of the error event that fired.
        event: &'static str,
        /// The error event's value, rendered through `Display`.
        reason: String,
    },

    /// The consumer terminated the stream early with a reason.
    #[error("aborted: {reason}")]
    Aborted {
        /// The reason passed to `abort`.
        reason: String,
    },
}

impl EventError {
    /// Builds the failure delivered when an error event fires.
    pub(crate) fn failure(event: &'static str, reason: impl std::fmt::Display) -> Self {
        EventError::Failure {
            event,
            reason: reason.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::Failure { .. } => "event_failure",
            EventError::Aborted { .. } => "event_aborted",
        }
    }
}

/// Renders a caught panic payload into something loggable.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(ListenerError::failed("x").as_label(), "listener_failed");
        let emit = EmitError::ListenerFailed {
            event: "demo",
            source: ListenerError::failed("x"),
        };
        assert_eq!(emit.as_label(), "emit_listener_failed");
        assert_eq!(EventError::failure("demo", "y").as_label(), "event_failure");
    }

    #[test]
    fn test_panic_message_rendering() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42_u8)), "non-string panic payload");
    }
}
