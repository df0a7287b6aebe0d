//! # Event key contract.
//!
//! An [`EventKey`] is a zero-sized marker type standing for one event name.
//! The associated [`Value`](EventKey::Value) type is the payload every
//! emission of that event carries; `()` marks a voidless event.

/// Compile-time association of one event name with its payload type.
///
/// Keys are never constructed; they are only used as type parameters to
/// [`Emitter`](crate::Emitter) operations. [`NAME`](EventKey::NAME) exists
/// for logs and error messages, not for identity — identity is the key type
/// itself.
///
/// # Example
/// ```
/// use emitry::EventKey;
///
/// struct Message;
///
/// impl EventKey for Message {
///     type Value = String;
///     const NAME: &'static str = "Message";
/// }
/// ```
pub trait EventKey: 'static {
    /// Payload carried by each emission of this event.
    ///
    /// Cloned once per listener during a dispatch; use `Arc<T>` for payloads
    /// that are expensive to clone.
    type Value: Clone + Send + Sync + 'static;

    /// Human-readable event name for logs and error messages.
    const NAME: &'static str;
}
