//! # Pull adapters: streams and one-shot futures over emitted events.
//!
//! The emitter pushes values at listeners; these adapters turn that push
//! into pull-based consumption:
//!
//! - [`EventStream`]: a `futures::Stream` over every occurrence of one
//!   event, with a bounded drop-oldest buffer and end/error termination.
//! - [`EventFuture`]: a future resolving with the next occurrence of one
//!   event, optionally racing an error event.
//!
//! Both install ordinary listeners on the emitter and detach them on
//! termination or drop; an adapter's failure never affects the emitter or
//! any other consumer.

mod stream;
mod terminal;
mod wait;

pub use stream::EventStream;
pub use wait::EventFuture;

pub(crate) use stream::open_stream;
pub(crate) use terminal::{Detach, TerminalTarget};
pub(crate) use wait::open_wait;
