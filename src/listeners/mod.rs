//! # Listeners: the callback contract and the per-event registry.
//!
//! This module provides the [`Listen`] trait — the extension point for
//! plugging handlers into the emitter — together with the registry that
//! stores them per event key.
//!
//! ## Contents
//! - [`Listen`], [`ListenerId`]: the async listener contract and the opaque
//!   registration handle used for removal.
//! - `Registry` (crate-internal): two ordered lists per event key
//!   (persistent, once); insertion order is invocation order.
//!
//! ## Quick reference
//! - **Writers**: `Emitter::on` / `once` / `off`, the stream/future adapters
//!   (their synthetic listeners), and deferred pending actions replayed by
//!   the scheduler.
//! - **Readers**: the scheduler's dispatch step (once snapshot-and-clear,
//!   persistent snapshot).

mod listener;
mod registry;

pub use listener::{Listen, ListenerId};

pub(crate) use registry::{Registered, Registry};
