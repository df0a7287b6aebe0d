//! Deferred registry mutations.
//!
//! A listener may add or remove listeners (including itself) while its own
//! dispatch is running. Applying such a mutation immediately would change the
//! lists mid-iteration, so the scheduler records it as a pending action and
//! replays it right after the in-flight dispatch finishes, in request order.

use crate::listeners::Registry;

/// One deferred registry mutation.
pub(crate) struct PendingAction {
    /// Operation tag for tracing (`add`, `add_once`, `remove`).
    pub(crate) op: &'static str,
    /// The mutation itself, applied against the registry.
    pub(crate) apply: Box<dyn FnOnce(&mut Registry) + Send>,
}
