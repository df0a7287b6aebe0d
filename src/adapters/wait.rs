//! # One-shot future over the next occurrence of an event.
//!
//! [`EventFuture`] resolves with the next value of its event. With an error
//! hook configured, a one-shot listener on the error event races the value
//! listener: whichever fires first settles the future, and the loser is
//! detached on the spot so a later firing cannot re-settle anything.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll, Waker};

use crate::adapters::terminal::{detach_all, Detach, TerminalTarget};
use crate::core::{Emitter, TerminalHook};
use crate::dispatch::Scheduler;
use crate::error::EventError;
use crate::events::EventKey;

struct WaitState<T> {
    outcome: Option<Result<T, EventError>>,
    waker: Option<Waker>,
    /// First settle wins; everything after is ignored.
    settled: bool,
    detach: Vec<Detach>,
}

/// Settlement cell shared between the future and its listeners.
pub(crate) struct WaitCell<T> {
    event: &'static str,
    scheduler: Weak<Scheduler>,
    state: Mutex<WaitState<T>>,
}

impl<T> WaitCell<T> {
    fn new(event: &'static str, scheduler: Weak<Scheduler>) -> Self {
        Self {
            event,
            scheduler,
            state: Mutex::new(WaitState {
                outcome: None,
                waker: None,
                settled: false,
                detach: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WaitState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the listeners backing this future, detaching immediately if a
    /// settlement raced in first.
    fn set_detach(&self, detaches: Vec<Detach>) {
        let stale = {
            let mut state = self.lock();
            if state.settled {
                Some(detaches)
            } else {
                state.detach = detaches;
                None
            }
        };
        if let Some(detaches) = stale {
            detach_all(&self.scheduler, detaches);
        }
    }

    /// Settles the future once; the racing listener is detached so it can
    /// never fire into a settled cell.
    fn settle(&self, outcome: Result<T, EventError>) {
        let (waker, detaches) = {
            let mut state = self.lock();
            if state.settled {
                return;
            }
            state.settled = true;
            state.outcome = Some(outcome);
            (state.waker.take(), std::mem::take(&mut state.detach))
        };
        detach_all(&self.scheduler, detaches);
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T: Clone + Send + Sync + 'static> TerminalTarget for WaitCell<T> {
    fn finish(&self) {
        // A wait has no end hook; nothing to do.
    }

    fn fault(&self, error: EventError) {
        self.settle(Err(error));
    }
}

/// Future resolving with the next occurrence of one event.
///
/// Produced by [`Emitter::wait`](crate::Emitter::wait). Resolves `Ok` with
/// the event value, or `Err` if a configured error event fires first.
/// Dropping an unsettled future detaches its listeners.
pub struct EventFuture<T> {
    cell: Arc<WaitCell<T>>,
}

impl<T> EventFuture<T> {
    /// Name of the awaited event.
    pub fn event(&self) -> &'static str {
        self.cell.event
    }
}

impl<T: Clone + Send + Sync + 'static> Future for EventFuture<T> {
    type Output = Result<T, EventError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut state = this.cell.lock();
        if let Some(outcome) = state.outcome.take() {
            Poll::Ready(outcome)
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<T> Drop for EventFuture<T> {
    fn drop(&mut self) {
        let detaches = {
            let mut state = self.cell.lock();
            state.settled = true;
            state.waker = None;
            std::mem::take(&mut state.detach)
        };
        detach_all(&self.cell.scheduler, detaches);
    }
}

impl<T> std::fmt::Debug for EventFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFuture").field("event", &self.cell.event).finish()
    }
}

/// Wires a new one-shot future onto the emitter: a one-shot value listener
/// plus an optional one-shot error listener.
pub(crate) fn open_wait<K: EventKey>(
    emitter: &Emitter,
    error: Option<&TerminalHook>,
) -> EventFuture<K::Value> {
    let cell = Arc::new(WaitCell::new(K::NAME, emitter.scheduler_weak()));

    let settler = Arc::clone(&cell);
    let id = emitter.register::<K>(
        Arc::new(move |value: K::Value| {
            let settler = Arc::clone(&settler);
            async move {
                settler.settle(Ok(value));
                Ok(())
            }
        }),
        true,
    );

    let mut detaches = vec![Detach {
        key: std::any::TypeId::of::<K>(),
        event: K::NAME,
        id,
    }];
    if let Some(hook) = error {
        let target: Arc<dyn TerminalTarget> = Arc::clone(&cell) as Arc<dyn TerminalTarget>;
        detaches.push(hook(emitter, &target));
    }
    cell.set_detach(detaches);

    EventFuture { cell }
}
