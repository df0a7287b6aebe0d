//! Macro for declaring event key types.

/// Declares marker types implementing [`EventKey`](crate::EventKey).
///
/// Each entry is `Name => PayloadType`; use `()` for voidless events.
///
/// # Examples
///
/// ```rust
/// emitry::events! {
///     /// A chat line arrived.
///     pub Message => String,
///     pub Closed => (),
///     pub Failed => String,
/// }
///
/// fn takes_key<K: emitry::EventKey>() -> &'static str { K::NAME }
/// assert_eq!(takes_key::<Message>(), "Message");
/// ```
#[macro_export]
macro_rules! events {
    ($( $(#[$meta:meta])* $vis:vis $key:ident => $value:ty ),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            $vis struct $key;

            impl $crate::EventKey for $key {
                type Value = $value;
                const NAME: &'static str = stringify!($key);
            }
        )+
    };
}
