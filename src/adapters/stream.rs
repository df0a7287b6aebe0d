//! # Pull-based stream over one event.
//!
//! [`EventStream`] converts pushes from the emitter into a
//! `futures::Stream`. Internally it is a small state machine with two
//! mutually exclusive channels — a bounded FIFO buffer of not-yet-pulled
//! items and the consumer's registered waker — plus a terminal flag.
//!
//! ## What it guarantees
//! - Values arrive in emission order (per-stream FIFO).
//! - With a bounded buffer, overflow drops the **oldest** buffered value;
//!   the newest values and any terminal item are kept.
//! - A terminal item is delivered exactly once (the error, if any), after
//!   which every poll reports exhaustion.
//!
//! ## What it does **not** guarantee
//! - No delivery of values emitted after termination or after overflow
//!   dropped them; a stream is a lossy window when bounded.
//! - No replay: iteration is single-pass and non-restartable.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll, Waker};

use futures::Stream;
use tracing::{trace, warn};

use crate::adapters::terminal::{detach_all, Detach, TerminalTarget};
use crate::core::{Emitter, TerminalHook};
use crate::dispatch::Scheduler;
use crate::error::EventError;
use crate::events::EventKey;

/// One buffered stream item.
enum StreamItem<T> {
    /// Value with continue.
    Next(T),
    /// End of stream.
    End,
    /// Failure with terminate.
    Failed(EventError),
}

struct SinkState<T> {
    buffer: VecDeque<StreamItem<T>>,
    waker: Option<Waker>,
    max_buffer: Option<usize>,
    /// Listeners to remove on termination or drop.
    detach: Vec<Detach>,
    /// A terminal item has been accepted; further pushes are ignored.
    closing: bool,
    /// The terminal item has been delivered; polls report exhaustion.
    finished: bool,
}

/// Push side shared between the stream and its listeners.
pub(crate) struct Sink<T> {
    event: &'static str,
    scheduler: Weak<Scheduler>,
    state: Mutex<SinkState<T>>,
}

impl<T> Sink<T> {
    fn new(event: &'static str, scheduler: Weak<Scheduler>, max_buffer: Option<usize>) -> Self {
        Self {
            event,
            scheduler,
            state: Mutex::new(SinkState {
                buffer: VecDeque::new(),
                waker: None,
                max_buffer,
                detach: Vec::new(),
                closing: false,
                finished: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the listeners backing this stream.
    ///
    /// If a terminal raced in before the listeners were recorded, they are
    /// detached on the spot.
    fn set_detach(&self, detaches: Vec<Detach>) {
        let stale = {
            let mut state = self.lock();
            if state.closing || state.finished {
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

    /// Buffers one value, waking the consumer and applying the drop-oldest
    /// overflow policy.
    fn push_value(&self, value: T) {
        let waker = {
            let mut state = self.lock();
            if state.closing || state.finished {
                trace!(event = self.event, "value after termination, ignoring");
                return;
            }
            state.buffer.push_back(StreamItem::Next(value));
            self.enforce_bound(&mut state);
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Accepts a terminal item, detaches the stream's listeners, and stops
    /// accepting further pushes. Idempotent.
    fn push_terminal(&self, item: StreamItem<T>) {
        let (waker, detaches) = {
            let mut state = self.lock();
            if state.closing || state.finished {
                return;
            }
            state.closing = true;
            state.buffer.push_back(item);
            self.enforce_bound(&mut state);
            (state.waker.take(), std::mem::take(&mut state.detach))
        };
        detach_all(&self.scheduler, detaches);
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Drop-oldest overflow: buffered values are dropped front-first; a
    /// buffered terminal item is never dropped.
    fn enforce_bound(&self, state: &mut SinkState<T>) {
        let Some(max) = state.max_buffer else { return };
        while state.buffer.len() > max
            && matches!(state.buffer.front(), Some(StreamItem::Next(_)))
        {
            state.buffer.pop_front();
            warn!(event = self.event, max, "stream buffer full, dropping oldest value");
        }
    }
}

impl<T: Send + 'static> TerminalTarget for Sink<T>
where
    T: Clone + Sync,
{
    fn finish(&self) {
        self.push_terminal(StreamItem::End);
    }

    fn fault(&self, error: EventError) {
        self.push_terminal(StreamItem::Failed(error));
    }
}

/// Pull-based asynchronous sequence over one event's values.
///
/// Produced by [`Emitter::stream`](crate::Emitter::stream). Implements
/// [`futures::Stream`] with `Item = Result<V, EventError>`: values yield
/// `Ok`, a configured error event (or [`abort`](EventStream::abort)) yields
/// one final `Err`, and exhaustion follows any terminal. Dropping the stream
/// detaches its listeners from the emitter.
pub struct EventStream<T> {
    sink: Arc<Sink<T>>,
}

impl<T> EventStream<T> {
    /// Terminates the stream now.
    ///
    /// Listeners are detached immediately; values already buffered are still
    /// delivered, then the stream reports exhaustion. Events emitted after
    /// the call never reach this stream.
    pub fn close(&mut self) {
        self.sink.push_terminal(StreamItem::End);
    }

    /// Terminates the stream now with a failure.
    ///
    /// Like [`close`](EventStream::close), but after any buffered values the
    /// stream yields one `Err(EventError::Aborted)` before reporting
    /// exhaustion.
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.sink.push_terminal(StreamItem::Failed(EventError::Aborted {
            reason: reason.into(),
        }));
    }

    /// Name of the event this stream pulls from.
    pub fn event(&self) -> &'static str {
        self.sink.event
    }
}

impl<T: Clone + Send + Sync + 'static> Stream for EventStream<T> {
    type Item = Result<T, EventError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let mut state = this.sink.lock();
        if state.finished {
            return Poll::Ready(None);
        }
        match state.buffer.pop_front() {
            Some(StreamItem::Next(value)) => Poll::Ready(Some(Ok(value))),
            Some(StreamItem::End) => {
                finish(&mut state);
                Poll::Ready(None)
            }
            Some(StreamItem::Failed(error)) => {
                finish(&mut state);
                Poll::Ready(Some(Err(error)))
            }
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// Tears the stream state down once its terminal item is delivered.
fn finish<T>(state: &mut SinkState<T>) {
    state.finished = true;
    state.buffer.clear();
    state.waker = None;
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        let detaches = {
            let mut state = self.sink.lock();
            state.closing = true;
            state.finished = true;
            state.buffer.clear();
            state.waker = None;
            std::mem::take(&mut state.detach)
        };
        detach_all(&self.sink.scheduler, detaches);
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").field("event", &self.sink.event).finish()
    }
}

/// Wires a new stream onto the emitter: a persistent listener for values
/// plus optional one-shot end/error listeners.
pub(crate) fn open_stream<K: EventKey>(
    emitter: &Emitter,
    max_buffer: Option<usize>,
    end: Option<&TerminalHook>,
    error: Option<&TerminalHook>,
) -> EventStream<K::Value> {
    let sink = Arc::new(Sink::new(K::NAME, emitter.scheduler_weak(), max_buffer));

    let pusher = Arc::clone(&sink);
    let id = emitter.register::<K>(
        Arc::new(move |value: K::Value| {
            let pusher = Arc::clone(&pusher);
            async move {
                pusher.push_value(value);
                Ok(())
            }
        }),
        false,
    );

    let mut detaches = vec![Detach {
        key: std::any::TypeId::of::<K>(),
        event: K::NAME,
        id,
    }];
    let target: Arc<dyn TerminalTarget> = Arc::clone(&sink) as Arc<dyn TerminalTarget>;
    if let Some(hook) = end {
        detaches.push(hook(emitter, &target));
    }
    if let Some(hook) = error {
        detaches.push(hook(emitter, &target));
    }
    sink.set_detach(detaches);

    EventStream { sink }
}
