//! One-shot futures racing a target event against an error event.
//!
//! Run with: `cargo run --example wait_race`

use emitry::{Emitter, WaitOptions};

emitry::events! {
    Connected => String,
    ConnectFailed => String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let emitter = Emitter::new();

    // Happy path: the target event fires first.
    let connected = emitter.wait_with::<Connected>(
        WaitOptions::new().error_on::<ConnectFailed>(),
    );
    emitter.emit::<Connected>("10.0.0.7:4222".into()).await?;
    // A late error firing has no effect: its listener was detached.
    emitter.emit::<ConnectFailed>("too late".into()).await?;
    println!("connected to {}", connected.await?);

    // Error path: the error event fires first and rejects the wait.
    let connected = emitter.wait_with::<Connected>(
        WaitOptions::new().error_on::<ConnectFailed>(),
    );
    emitter.emit::<ConnectFailed>("dns timeout".into()).await?;
    match connected.await {
        Ok(addr) => println!("unexpectedly connected to {addr}"),
        Err(err) => println!("connection failed: {err}"),
    }
    Ok(())
}
