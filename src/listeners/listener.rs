//! # Core listener trait.
//!
//! `Listen` is the extension point for attaching handlers to an event. Every
//! registration is driven by the emitter's single dispatch task; listeners
//! for one dispatch are awaited collectively, so a slow listener delays that
//! emit's completion but never reorders dispatches.
//!
//! Async closures get a blanket implementation, so most call sites just pass
//! a closure:
//!
//! ```rust
//! use emitry::{Emitter, EventKey};
//!
//! struct Message;
//! impl EventKey for Message {
//!     type Value = String;
//!     const NAME: &'static str = "Message";
//! }
//!
//! let emitter = Emitter::new();
//! emitter.on::<Message>(|text: String| async move {
//!     println!("got: {text}");
//!     Ok(())
//! });
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::error::ListenerResult;

/// Opaque handle identifying one listener registration.
///
/// Each call to `on`/`once` returns a fresh id, even for the same closure;
/// passing the id to `off` removes exactly that registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Contract for event listeners.
///
/// Called from the emitter's dispatch task with an owned clone of the event
/// value. A listener fails by returning `Err` or by panicking; panics are
/// caught per invocation and surface on the owning emit's completion handle
/// without disturbing sibling listeners.
#[async_trait]
pub trait Listen<T: Send + 'static>: Send + Sync + 'static {
    /// Handles a single occurrence of the event.
    async fn invoke(&self, value: T) -> ListenerResult;
}

#[async_trait]
impl<T, F, Fut> Listen<T> for F
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ListenerResult> + Send + 'static,
{
    async fn invoke(&self, value: T) -> ListenerResult {
        (self)(value).await
    }
}
