//! # Emitter: the public facade.
//!
//! [`Emitter`] wires the listener registry, the emission scheduler, and the
//! pull adapters together. It is cheap to clone; all clones share one
//! registry and one dispatch queue, so ordering guarantees hold across
//! clones.
//!
//! ## Key responsibilities
//! - register/remove listeners (`on` / `once` / `off`)
//! - queue emissions and hand back their completion handles (`emit`)
//! - open pull adapters (`stream` / `wait`) and resolve their options
//!   against the instance [`Config`]

use std::any::TypeId;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::FutureExt;

use crate::adapters::{open_stream, open_wait, Detach, EventStream, EventFuture, TerminalTarget};
use crate::core::{Config, StreamOptions, WaitOptions};
use crate::dispatch::{EmitHandle, EmitRequest, ListenerCall, PendingAction, Scheduler};
use crate::error::{EventError, ListenerError, ListenerResult};
use crate::events::EventKey;
use crate::listeners::{Listen, ListenerId, Registered, Registry};

/// Typed event emitter with serialized dispatch.
///
/// Emissions queue up FIFO and dispatch one at a time on a deferred task;
/// `emit` always returns before any listener runs. Within one dispatch,
/// one-shot listeners run before persistent ones, each group in
/// registration order, and all invocations are awaited collectively.
/// Listeners may freely register/remove listeners or emit re-entrantly;
/// structural changes made during a dispatch become visible with the next
/// dispatch.
///
/// All operations require a running tokio runtime.
///
/// **WARNING:** a listener that captures a clone of its own `Emitter` forms
/// an `Arc` reference cycle (the registry owns the listener, the listener
/// owns the emitter) and the emitter will never be freed. Capture the data
/// the listener needs, or drop the listener with [`off`](Emitter::off) when
/// done.
///
/// # Example
/// ```
/// use emitry::Emitter;
///
/// emitry::events! {
///     Message => String,
/// }
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let emitter = Emitter::new();
/// emitter.on::<Message>(|text: String| async move {
///     println!("received: {text}");
///     Ok(())
/// });
///
/// emitter.emit::<Message>("hello".into()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Emitter {
    scheduler: Arc<Scheduler>,
    config: Config,
}

impl Emitter {
    /// Creates an emitter with an empty [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Creates an emitter with the given per-instance defaults.
    pub fn with_config(config: Config) -> Self {
        Self {
            scheduler: Scheduler::new(),
            config,
        }
    }

    /// Registers a persistent listener for `K`.
    ///
    /// The listener runs on every subsequent dispatch of `K` until removed
    /// via [`off`](Emitter::off). Returns the registration handle.
    pub fn on<K: EventKey>(&self, listener: impl Listen<K::Value>) -> ListenerId {
        self.register::<K>(Arc::new(listener), false)
    }

    /// Registers a one-shot listener for `K`.
    ///
    /// The listener runs on the next dispatch of `K` — before any
    /// persistent listeners — and is removed in the same step.
    pub fn once<K: EventKey>(&self, listener: impl Listen<K::Value>) -> ListenerId {
        self.register::<K>(Arc::new(listener), true)
    }

    /// Removes one listener registration.
    ///
    /// Removing an unknown or already-removed id is a no-op. Called from
    /// within a listener, the removal takes effect right after the current
    /// dispatch.
    pub fn off<K: EventKey>(&self, id: ListenerId) {
        let key = TypeId::of::<K>();
        self.scheduler.mutate(PendingAction {
            op: "remove",
            apply: Box::new(move |registry: &mut Registry| {
                registry.remove(key, id);
            }),
        });
    }

    /// Queues an emission of `K` carrying `value`.
    ///
    /// Returns a handle settling once every listener of this dispatch has
    /// finished: `Ok(())` if all succeeded, otherwise the first failure in
    /// listener order. An emission with zero listeners still resolves.
    /// Dropping the handle does not cancel the dispatch.
    pub fn emit<K: EventKey>(&self, value: K::Value) -> EmitHandle {
        let (done, handle) = EmitHandle::channel(K::NAME);
        let prepare = Box::new(move |registry: &mut Registry| {
            let once = registry.take_once::<K>();
            let persistent = registry.snapshot::<K>();
            let mut calls: Vec<ListenerCall> = Vec::with_capacity(once.len() + persistent.len());
            for entry in once.into_iter().chain(persistent) {
                let value = value.clone();
                // The invoke call happens inside the guarded future, so a
                // panic anywhere in the listener is caught.
                let call = AssertUnwindSafe(async move { entry.listener.invoke(value).await })
                    .catch_unwind()
                    .map(|outcome| match outcome {
                        Ok(result) => result,
                        Err(payload) => Err(ListenerError::panicked(payload)),
                    })
                    .boxed();
                calls.push(call);
            }
            calls
        });
        self.scheduler.enqueue(EmitRequest {
            event: K::NAME,
            prepare,
            done,
        });
        handle
    }

    /// Queues an emission of a voidless event.
    pub fn signal<K: EventKey<Value = ()>>(&self) -> EmitHandle {
        self.emit::<K>(())
    }

    /// Opens a pull-based stream over `K` using the instance defaults.
    pub fn stream<K: EventKey>(&self) -> EventStream<K::Value> {
        self.stream_with::<K>(StreamOptions::new())
    }

    /// Opens a pull-based stream over `K`, overriding instance defaults
    /// with any options set per call.
    pub fn stream_with<K: EventKey>(&self, options: StreamOptions) -> EventStream<K::Value> {
        let max_buffer = options.max_buffer.or(self.config.max_buffer);
        let end = options.end.as_ref().or(self.config.end.as_ref());
        let error = options.error.as_ref().or(self.config.error.as_ref());
        open_stream::<K>(self, max_buffer, end, error)
    }

    /// Returns a future resolving with the next occurrence of `K`, using
    /// the instance default error event (if any).
    pub fn wait<K: EventKey>(&self) -> EventFuture<K::Value> {
        self.wait_with::<K>(WaitOptions::new())
    }

    /// Returns a future resolving with the next occurrence of `K`,
    /// overriding the instance default error event if one is set per call.
    pub fn wait_with<K: EventKey>(&self, options: WaitOptions) -> EventFuture<K::Value> {
        let error = options.error.as_ref().or(self.config.error.as_ref());
        open_wait::<K>(self, error)
    }

    /// Number of registrations (persistent + one-shot) currently held for
    /// `K`. Mostly useful in tests and diagnostics.
    pub fn listener_count<K: EventKey>(&self) -> usize {
        self.scheduler
            .with_registry(|registry| registry.len_of(TypeId::of::<K>()))
    }

    // ---------------------------
    // Adapter wiring (crate-internal)
    // ---------------------------

    pub(crate) fn register<K: EventKey>(
        &self,
        listener: Arc<dyn Listen<K::Value>>,
        once: bool,
    ) -> ListenerId {
        let id = self.scheduler.next_listener_id();
        let entry = Registered { id, listener };
        let op = if once { "add_once" } else { "add" };
        self.scheduler.mutate(PendingAction {
            op,
            apply: Box::new(move |registry: &mut Registry| {
                if once {
                    registry.add_once::<K>(entry);
                } else {
                    registry.add_persistent::<K>(entry);
                }
            }),
        });
        id
    }

    pub(crate) fn install_end_listener<K: EventKey>(
        &self,
        target: &Arc<dyn TerminalTarget>,
    ) -> Detach {
        let target = Arc::clone(target);
        let id = self.register::<K>(
            Arc::new(move |_value: K::Value| {
                let target = Arc::clone(&target);
                async move {
                    target.finish();
                    ListenerResult::Ok(())
                }
            }),
            true,
        );
        Detach {
            key: TypeId::of::<K>(),
            event: K::NAME,
            id,
        }
    }

    pub(crate) fn install_error_listener<K: EventKey>(
        &self,
        target: &Arc<dyn TerminalTarget>,
    ) -> Detach
    where
        K::Value: std::fmt::Display,
    {
        let target = Arc::clone(target);
        let id = self.register::<K>(
            Arc::new(move |value: K::Value| {
                let target = Arc::clone(&target);
                async move {
                    target.fault(EventError::failure(K::NAME, value));
                    ListenerResult::Ok(())
                }
            }),
            true,
        );
        Detach {
            key: TypeId::of::<K>(),
            event: K::NAME,
            id,
        }
    }

    pub(crate) fn scheduler_weak(&self) -> Weak<Scheduler> {
        Arc::downgrade(&self.scheduler)
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::core::Emitter;
    use crate::error::{EmitError, ListenerError};
    use crate::listeners::ListenerId;

    crate::events! {
        Tick => (),
        Count => u32,
        Ping => (),
        Pong => (),
    }

    fn counting(counter: &Arc<AtomicUsize>, step: usize) -> impl Fn(()) -> futures::future::BoxFuture<'static, crate::ListenerResult> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move |_: ()| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(step, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_emit_returns_before_listeners_run() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicUsize::new(0));
        emitter.on::<Tick>(counting(&counter, 1));

        let handle = emitter.signal::<Tick>();
        // Dispatch is deferred; nothing ran inside our stack.
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        handle.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_order_is_emit_order() {
        let emitter = Emitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        emitter.on::<Count>(move |value: u32| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(value);
                Ok(())
            }
        });

        let h1 = emitter.emit::<Count>(1);
        let h2 = emitter.emit::<Count>(2);
        let h3 = emitter.emit::<Count>(3);
        h1.await.unwrap();
        h2.await.unwrap();
        h3.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_once_runs_before_persistent_and_exactly_once() {
        let emitter = Emitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["p1", "p2"] {
            let sink = Arc::clone(&seen);
            emitter.on::<Tick>(move |_: ()| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(label);
                    Ok(())
                }
            });
        }
        for label in ["o1", "o2"] {
            let sink = Arc::clone(&seen);
            emitter.once::<Tick>(move |_: ()| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(label);
                    Ok(())
                }
            });
        }

        emitter.signal::<Tick>().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["o1", "o2", "p1", "p2"]);

        emitter.signal::<Tick>().await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["o1", "o2", "p1", "p2", "p1", "p2"]
        );
    }

    #[tokio::test]
    async fn test_emit_with_no_listeners_resolves() {
        let emitter = Emitter::new();
        emitter.signal::<Tick>().await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_listener_rejects_but_siblings_run() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicUsize::new(0));

        emitter.on::<Tick>(|_: ()| async move { Err(ListenerError::failed("first failure")) });
        emitter.on::<Tick>(counting(&counter, 1));

        let err = emitter.signal::<Tick>().await.unwrap_err();
        match err {
            EmitError::ListenerFailed { event, source } => {
                assert_eq!(event, "Tick");
                assert_eq!(source.to_string(), "first failure");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The failure did not stop the sibling.
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // The emitter stays usable after a failed dispatch.
        emitter.signal::<Tick>().await.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let emitter = Emitter::new();
        emitter.on::<Tick>(|_: ()| async move { Err(ListenerError::failed("one")) });
        emitter.on::<Tick>(|_: ()| async move { Err(ListenerError::failed("two")) });

        let err = emitter.signal::<Tick>().await.unwrap_err();
        match err {
            EmitError::ListenerFailed { source, .. } => {
                assert_eq!(source.to_string(), "one");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_listener_rejects_with_panic_failure() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicUsize::new(0));

        emitter.on::<Tick>(|_: ()| async move { panic!("kaboom") });
        emitter.on::<Tick>(counting(&counter, 1));

        let err = emitter.signal::<Tick>().await.unwrap_err();
        match err {
            EmitError::ListenerFailed { source, .. } => {
                assert_eq!(source.as_label(), "listener_panicked");
                assert!(source.to_string().contains("kaboom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listener_added_during_dispatch_joins_next_dispatch() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let em = emitter.clone();
        let outer = Arc::clone(&counter);
        emitter.on::<Tick>(move |_: ()| {
            let em = em.clone();
            let outer = Arc::clone(&outer);
            async move {
                let inner = Arc::clone(&outer);
                em.on::<Tick>(move |_: ()| {
                    let inner = Arc::clone(&inner);
                    async move {
                        inner.fetch_add(10, Ordering::SeqCst);
                        Ok(())
                    }
                });
                outer.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        emitter.signal::<Tick>().await.unwrap();
        // The listener added mid-dispatch did not run in that dispatch.
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        emitter.signal::<Tick>().await.unwrap();
        // Next dispatch: the original (+1, adds another) and the added (+10).
        assert_eq!(counter.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_listener_removing_itself_mid_dispatch() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let em = emitter.clone();
        let c = Arc::clone(&counter);
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let slot_in = Arc::clone(&slot);
        let id = emitter.on::<Tick>(move |_: ()| {
            let em = em.clone();
            let c = Arc::clone(&c);
            let slot_in = Arc::clone(&slot_in);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *slot_in.lock().unwrap() {
                    em.off::<Tick>(id);
                }
                Ok(())
            }
        });
        *slot.lock().unwrap() = Some(id);

        emitter.signal::<Tick>().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count::<Tick>(), 0);

        emitter.signal::<Tick>().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reentrant_emit_keeps_fifo_order() {
        let emitter = Emitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let em = emitter.clone();
        let sink = Arc::clone(&seen);
        emitter.on::<Ping>(move |_: ()| {
            let em = em.clone();
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push("ping");
                // Queued behind every already-queued emission.
                let _ = em.signal::<Pong>();
                Ok(())
            }
        });
        let sink = Arc::clone(&seen);
        emitter.on::<Pong>(move |_: ()| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push("pong");
                Ok(())
            }
        });

        let h1 = emitter.signal::<Ping>();
        let h2 = emitter.signal::<Ping>();
        h1.await.unwrap();
        h2.await.unwrap();
        // Give the two re-entrant Pong dispatches time to drain.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(*seen.lock().unwrap(), vec!["ping", "ping", "pong", "pong"]);
    }

    #[tokio::test]
    async fn test_off_removes_one_registration_of_duplicates() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = emitter.on::<Tick>(counting(&counter, 1));
        let _second = emitter.on::<Tick>(counting(&counter, 1));

        emitter.off::<Tick>(first);
        emitter.signal::<Tick>().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count::<Tick>(), 1);
    }
}
