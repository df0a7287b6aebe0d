//! # emitry
//!
//! **emitry** is a typed asynchronous event emitter for Rust.
//!
//! One emitted event can be consumed three ways: callback listeners,
//! one-shot futures, and pull-based streams with bounded buffering. All
//! emissions go through a single serialized dispatch queue, so listeners
//! observe a consistent world even when they mutate it.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     emit::<K>(value)        on/once/off::<K>(..)
//!           │                         │
//!           ▼                         ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Emitter (facade)                                                │
//! │  - Scheduler (FIFO emit queue, single drain task)                │
//! │  - Registry (per-key listener lists: persistent + once)          │
//! │  - Config (default end/error events, buffer bound)               │
//! └───────┬───────────────────────┬──────────────────────┬───────────┘
//!         ▼                       ▼                      ▼
//!   user listeners        EventStream<K::Value>    EventFuture<K::Value>
//!   (Listen<T>)           (persistent listener,    (once listener,
//!                          bounded buffer,          optional error-event
//!                          end/error events)        race)
//! ```
//!
//! ### Dispatch lifecycle
//! ```text
//! emit::<K>(value) ──► queue ──► drain task (at most one per emitter)
//!
//! loop {
//!   ├─► pop one request (FIFO across all events)
//!   ├─► snapshot: take once-listeners, clone persistent list
//!   ├─► invoke once listeners, then persistent, in registration order
//!   │     (each panic-wrapped; all awaited collectively)
//!   ├─► settle the EmitHandle: Ok, or first failure in listener order
//!   ├─► replay registry mutations deferred during the dispatch
//!   └─► yield, continue until the queue is empty
//! }
//! ```
//!
//! ## Features
//! | Area          | Description                                            | Key types / traits             |
//! |---------------|--------------------------------------------------------|--------------------------------|
//! | **Events**    | Compile-time event-name → payload-type association.    | [`EventKey`], [`events!`]      |
//! | **Listeners** | Async callbacks with panic isolation, per-id removal.  | [`Listen`], [`ListenerId`]     |
//! | **Emission**  | Serialized FIFO dispatch with per-emit completion.     | [`EmitHandle`], [`EmitError`]  |
//! | **Streams**   | Pull-based sequences with drop-oldest backpressure.    | [`EventStream`]                |
//! | **Futures**   | Next-occurrence futures with error-event race.         | [`EventFuture`]                |
//! | **Options**   | Instance defaults plus per-call overrides.             | [`Config`], [`StreamOptions`]  |
//!
//! ## Example
//! ```rust
//! use emitry::{Config, Emitter};
//! use futures::StreamExt;
//!
//! emitry::events! {
//!     Line => String,
//!     Closed => (),
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let emitter = Emitter::with_config(Config::new().end_on::<Closed>());
//!
//!     emitter.on::<Line>(|line: String| async move {
//!         println!("listener saw: {line}");
//!         Ok(())
//!     });
//!
//!     let mut lines = emitter.stream::<Line>();
//!
//!     emitter.emit::<Line>("hello".into()).await?;
//!     emitter.signal::<Closed>().await?;
//!
//!     while let Some(line) = lines.next().await {
//!         println!("stream saw: {}", line?);
//!     }
//!     Ok(())
//! }
//! ```

mod adapters;
mod core;
mod dispatch;
mod error;
mod events;
mod listeners;

// ---- Public re-exports ----

pub use crate::adapters::{EventFuture, EventStream};
pub use crate::core::{Config, Emitter, StreamOptions, WaitOptions};
pub use crate::dispatch::EmitHandle;
pub use crate::error::{EmitError, EventError, ListenerError, ListenerResult};
pub use crate::events::EventKey;
pub use crate::listeners::{Listen, ListenerId};
