//! Minimal emitter usage: register listeners, emit, await completion.
//!
//! Run with: `cargo run --example basic_emit`

use emitry::{Emitter, ListenerError};

emitry::events! {
    Greeting => String,
    Shutdown => (),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let emitter = Emitter::new();

    emitter.on::<Greeting>(|name: String| async move {
        println!("hello, {name}!");
        Ok(())
    });

    emitter.once::<Greeting>(|name: String| async move {
        println!("(first greeting only) welcome aboard, {name}");
        Ok(())
    });

    emitter.on::<Greeting>(|name: String| async move {
        if name == "eve" {
            return Err(ListenerError::failed("eve is not allowed"));
        }
        Ok(())
    });

    emitter.emit::<Greeting>("alice".into()).await?;
    emitter.emit::<Greeting>("bob".into()).await?;

    // The failing listener rejects this emit's handle; the other listeners
    // still ran, and the emitter stays usable.
    if let Err(err) = emitter.emit::<Greeting>("eve".into()).await {
        println!("emit failed as expected: {err}");
    }

    emitter.signal::<Shutdown>().await?;
    Ok(())
}
