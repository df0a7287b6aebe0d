//! Event keys: the compile-time name → payload-type association.
//!
//! An event is identified by a marker type implementing [`EventKey`]; the
//! key's associated `Value` type is the payload carried by every emission of
//! that event. The set of events an application uses is the closed set of key
//! types it declares, so attaching a listener with the wrong payload type is
//! a compile error rather than a runtime one.
//!
//! The [`events!`](crate::events!) macro declares key types with less
//! ceremony.

mod key;
mod macros;

pub use key::EventKey;
