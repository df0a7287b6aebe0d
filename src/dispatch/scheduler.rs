//! # The drain loop: one dispatch at a time, strictly FIFO.
//!
//! The scheduler holds all mutable emitter state behind one lock: the
//! listener registry, the emit queue, the pending-action list, and the two
//! flags that make re-entrancy safe (`draining`: a drain task exists;
//! `dispatching`: that task is currently between snapshot and settle).
//!
//! The lock is never held across an await. A dispatch step snapshots the
//! listener lists under the lock, releases it, runs the listeners, and only
//! then re-acquires the lock to replay deferred mutations. Listeners are
//! therefore free to call any emitter operation without deadlocking and
//! without corrupting the iteration they are part of.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{join_all, BoxFuture};
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::dispatch::PendingAction;
use crate::error::EmitError;
use crate::error::ListenerResult;
use crate::listeners::{ListenerId, Registry};

/// One listener invocation, panic-wrapped and ready to await.
pub(crate) type ListenerCall = BoxFuture<'static, ListenerResult>;

/// One queued emit call.
///
/// `prepare` runs under the state lock at dispatch time: it consumes the
/// one-shot list for the event, snapshots the persistent list, and returns
/// the invocation futures in listener order (once before persistent).
pub(crate) struct EmitRequest {
    pub(crate) event: &'static str,
    pub(crate) prepare: Box<dyn FnOnce(&mut Registry) -> Vec<ListenerCall> + Send>,
    pub(crate) done: oneshot::Sender<Result<(), EmitError>>,
}

struct State {
    registry: Registry,
    queue: VecDeque<EmitRequest>,
    pending: Vec<PendingAction>,
    draining: bool,
    dispatching: bool,
    next_listener_id: u64,
}

/// Per-emitter scheduler shared by all clones of the facade.
pub(crate) struct Scheduler {
    state: Mutex<State>,
}

impl Scheduler {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                registry: Registry::new(),
                queue: VecDeque::new(),
                pending: Vec::new(),
                draining: false,
                dispatching: false,
                next_listener_id: 0,
            }),
        })
    }

    /// Allocates the next registration handle.
    pub(crate) fn next_listener_id(&self) -> ListenerId {
        let mut state = self.lock();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        ListenerId(id)
    }

    /// Applies a registry mutation now, or defers it if a dispatch is in
    /// flight. Deferred actions replay in request order right after that
    /// dispatch finishes.
    pub(crate) fn mutate(&self, action: PendingAction) {
        let mut state = self.lock();
        if state.dispatching {
            trace!(op = action.op, "dispatch in flight, deferring registry mutation");
            state.pending.push(action);
        } else {
            (action.apply)(&mut state.registry);
        }
    }

    /// Read-only access to the registry (listener counts, diagnostics).
    pub(crate) fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.lock().registry)
    }

    /// Queues an emit request, starting the drain task if none is active.
    ///
    /// The drain task runs on the tokio runtime; listeners never execute
    /// inside the caller's stack.
    pub(crate) fn enqueue(self: &Arc<Self>, request: EmitRequest) {
        let mut state = self.lock();
        trace!(event = request.event, queued = state.queue.len(), "emit enqueued");
        state.queue.push_back(request);
        if !state.draining {
            state.draining = true;
            tokio::spawn(Arc::clone(self).drain());
        }
    }

    /// Processes queued emits one at a time until the queue is empty.
    async fn drain(self: Arc<Self>) {
        loop {
            let (event, calls, done) = {
                let mut state = self.lock();
                let Some(request) = state.queue.pop_front() else {
                    state.draining = false;
                    return;
                };
                let EmitRequest { event, prepare, done } = request;
                state.dispatching = true;
                // A panicking payload Clone must not kill the drain task.
                let prepared = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    prepare(&mut state.registry)
                }));
                match prepared {
                    Ok(calls) => (event, calls, done),
                    Err(payload) => {
                        state.dispatching = false;
                        let source = crate::error::ListenerError::panicked(payload);
                        warn!(event, label = source.as_label(), "dispatch preparation panicked");
                        let _ = done.send(Err(EmitError::ListenerFailed { event, source }));
                        continue;
                    }
                }
            };

            trace!(event, listeners = calls.len(), "dispatching");
            let results = join_all(calls).await;
            let outcome = match results.into_iter().find_map(Result::err) {
                None => Ok(()),
                Some(source) => {
                    warn!(event, label = source.as_label(), "listener failed during dispatch");
                    Err(EmitError::ListenerFailed { event, source })
                }
            };
            // The handle may have been dropped (fire-and-forget emit).
            let _ = done.send(outcome);

            {
                let mut state = self.lock();
                state.dispatching = false;
                let pending = std::mem::take(&mut state.pending);
                for action in pending {
                    (action.apply)(&mut state.registry);
                }
            }

            // Hand the executor a chance to run woken callers between steps.
            tokio::task::yield_now().await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic inside `prepare` (e.g. a panicking Clone impl) must not
        // wedge the emitter, so poisoning is absorbed.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
