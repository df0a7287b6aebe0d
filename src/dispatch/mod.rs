//! # Emission scheduler: serialized, re-entrant-safe dispatch.
//!
//! This module owns the FIFO queue of pending emit requests and the single
//! drain task that processes them one at a time.
//!
//! ## Architecture
//! ```text
//! emit::<K>(value)                       (any caller, synchronous)
//!     │  enqueue EmitRequest ───────────► [ queue ] ── spawn drain if idle
//!     └─ returns EmitHandle                   │
//!                                             ▼ (one request at a time)
//!                                     dispatch step:
//!                                       snapshot once + persistent lists
//!                                       run listeners, await collectively
//!                                       settle the request's EmitHandle
//!                                       replay deferred registry mutations
//! ```
//!
//! ## Rules
//! - At most one drain task per emitter; dispatch order is emit-call order
//!   across all events.
//! - Listeners never run inside the caller's stack; `emit` returns first.
//! - Registry mutations requested while a dispatch is in flight are deferred
//!   and replayed, in order, immediately after that dispatch finishes.

mod handle;
mod pending;
mod scheduler;

pub use handle::EmitHandle;

pub(crate) use pending::PendingAction;
pub(crate) use scheduler::{EmitRequest, ListenerCall, Scheduler};
