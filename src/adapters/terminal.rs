//! Shared plumbing for adapter termination.
//!
//! End/error events are wired into adapters through type-erased hooks (the
//! payload type of an end or error event is unrelated to the adapter's item
//! type). [`TerminalTarget`] is the erased side of that wiring; [`Detach`]
//! records one installed listener so the adapter can remove it later.

use std::any::TypeId;
use std::sync::Weak;

use tracing::trace;

use crate::dispatch::{PendingAction, Scheduler};
use crate::error::EventError;
use crate::listeners::ListenerId;

/// Record of one listener installed on behalf of an adapter.
pub(crate) struct Detach {
    pub(crate) key: TypeId,
    pub(crate) event: &'static str,
    pub(crate) id: ListenerId,
}

/// Type-erased terminal input of an adapter.
///
/// End hooks call [`finish`](TerminalTarget::finish), error hooks call
/// [`fault`](TerminalTarget::fault). Both are idempotent: once an adapter
/// has accepted a terminal, later calls are ignored.
pub(crate) trait TerminalTarget: Send + Sync + 'static {
    fn finish(&self);
    fn fault(&self, error: EventError);
}

/// Removes the recorded listeners from the emitter's registry.
///
/// Safe to call at any time: during an active dispatch the removals are
/// deferred by the scheduler, otherwise they apply immediately. Unknown ids
/// (e.g. an already-consumed one-shot listener) are no-ops.
pub(crate) fn detach_all(scheduler: &Weak<Scheduler>, detaches: Vec<Detach>) {
    let Some(scheduler) = scheduler.upgrade() else {
        return;
    };
    for detach in detaches {
        trace!(event = detach.event, "detaching adapter listener");
        scheduler.mutate(PendingAction {
            op: "remove",
            apply: Box::new(move |registry| {
                registry.remove(detach.key, detach.id);
            }),
        });
    }
}
