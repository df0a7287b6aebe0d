//! # Emitter configuration and per-call adapter options.
//!
//! [`Config`] carries per-instance defaults consumed by
//! [`stream`](crate::Emitter::stream) and [`wait`](crate::Emitter::wait)
//! whenever a per-call option does not override them:
//!
//! - default end event and error event for adapters;
//! - default stream buffer bound (`None` = unbounded).
//!
//! End/error events are stored as type-erased installer hooks: the key type
//! is fixed where the builder method is called, while the adapter's payload
//! type stays free.
//!
//! ## Field semantics
//! - `max_buffer = None` → unbounded buffering (default)
//! - `max_buffer = Some(n)` → at most `n` buffered values, drop-oldest
//!
//! A per-call option set to "inherit" (the default) falls back to the
//! instance default; explicitly set per-call values win.

use std::fmt::Display;
use std::sync::Arc;

use crate::adapters::{Detach, TerminalTarget};
use crate::core::Emitter;
use crate::events::EventKey;

/// Installs a one-shot end/error listener for a fixed event key onto an
/// emitter, feeding the given adapter target.
pub(crate) type TerminalHook =
    Arc<dyn Fn(&Emitter, &Arc<dyn TerminalTarget>) -> Detach + Send + Sync>;

/// Per-instance defaults for an [`Emitter`].
///
/// # Example
/// ```
/// use emitry::{Config, Emitter};
///
/// emitry::events! {
///     Line => String,
///     Closed => (),
///     Failed => String,
/// }
///
/// let emitter = Emitter::with_config(
///     Config::new()
///         .end_on::<Closed>()
///         .error_on::<Failed>()
///         .max_buffer(64),
/// );
/// let lines = emitter.stream::<Line>(); // ends on Closed, fails on Failed
/// ```
#[derive(Clone, Default)]
pub struct Config {
    pub(crate) max_buffer: Option<usize>,
    pub(crate) end: Option<TerminalHook>,
    pub(crate) error: Option<TerminalHook>,
}

impl Config {
    /// Empty configuration: no default end/error events, unbounded buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default stream buffer bound (drop-oldest on overflow).
    pub fn max_buffer(mut self, limit: usize) -> Self {
        self.max_buffer = Some(limit);
        self
    }

    /// Sets the default end event: streams terminate when `K` fires.
    pub fn end_on<K: EventKey>(mut self) -> Self {
        self.end = Some(end_hook::<K>());
        self
    }

    /// Sets the default error event: adapters fail when `K` fires, carrying
    /// its value rendered through `Display`.
    pub fn error_on<K: EventKey>(mut self) -> Self
    where
        K::Value: Display,
    {
        self.error = Some(error_hook::<K>());
        self
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("max_buffer", &self.max_buffer)
            .field("end", &self.end.as_ref().map(|_| "…"))
            .field("error", &self.error.as_ref().map(|_| "…"))
            .finish()
    }
}

/// Per-call options for [`Emitter::stream_with`](crate::Emitter::stream_with).
///
/// Unset fields inherit the emitter's [`Config`] defaults.
#[derive(Clone, Default)]
pub struct StreamOptions {
    pub(crate) max_buffer: Option<usize>,
    pub(crate) end: Option<TerminalHook>,
    pub(crate) error: Option<TerminalHook>,
}

impl StreamOptions {
    /// Options inheriting every instance default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds this stream's buffer (drop-oldest on overflow).
    pub fn max_buffer(mut self, limit: usize) -> Self {
        self.max_buffer = Some(limit);
        self
    }

    /// Terminates this stream when `K` fires.
    pub fn end_on<K: EventKey>(mut self) -> Self {
        self.end = Some(end_hook::<K>());
        self
    }

    /// Fails this stream when `K` fires.
    pub fn error_on<K: EventKey>(mut self) -> Self
    where
        K::Value: Display,
    {
        self.error = Some(error_hook::<K>());
        self
    }
}

impl std::fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOptions")
            .field("max_buffer", &self.max_buffer)
            .field("end", &self.end.as_ref().map(|_| "…"))
            .field("error", &self.error.as_ref().map(|_| "…"))
            .finish()
    }
}

/// Per-call options for [`Emitter::wait_with`](crate::Emitter::wait_with).
///
/// An unset error event inherits the emitter's [`Config`] default.
#[derive(Clone, Default)]
pub struct WaitOptions {
    pub(crate) error: Option<TerminalHook>,
}

impl WaitOptions {
    /// Options inheriting the instance defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects this wait when `K` fires.
    pub fn error_on<K: EventKey>(mut self) -> Self
    where
        K::Value: Display,
    {
        self.error = Some(error_hook::<K>());
        self
    }
}

impl std::fmt::Debug for WaitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitOptions")
            .field("error", &self.error.as_ref().map(|_| "…"))
            .finish()
    }
}

fn end_hook<K: EventKey>() -> TerminalHook {
    Arc::new(|emitter: &Emitter, target: &Arc<dyn TerminalTarget>| {
        emitter.install_end_listener::<K>(target)
    })
}

fn error_hook<K: EventKey>() -> TerminalHook
where
    K::Value: Display,
{
    Arc::new(|emitter: &Emitter, target: &Arc<dyn TerminalTarget>| {
        emitter.install_error_listener::<K>(target)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::events! {
        Done => (),
        Oops => String,
    }

    #[test]
    fn test_defaults_are_empty() {
        let config = Config::new();
        assert!(config.max_buffer.is_none());
        assert!(config.end.is_none());
        assert!(config.error.is_none());
    }

    #[test]
    fn test_builders_set_fields() {
        let config = Config::new().max_buffer(8).end_on::<Done>().error_on::<Oops>();
        assert_eq!(config.max_buffer, Some(8));
        assert!(config.end.is_some());
        assert!(config.error.is_some());

        let options = StreamOptions::new().max_buffer(2);
        assert_eq!(options.max_buffer, Some(2));
        assert!(options.end.is_none());
    }
}
