//! Pull-based stream with a bounded drop-oldest buffer.
//!
//! Run with: `cargo run --example stream_backpressure`

use futures::StreamExt;

use emitry::{Emitter, StreamOptions};

emitry::events! {
    Sample => u64,
    Done => (),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let emitter = Emitter::new();

    // Keep at most 3 samples: a slow consumer sees the newest window, the
    // oldest samples are dropped (with a tracing warning per drop).
    let mut samples = emitter.stream_with::<Sample>(
        StreamOptions::new().max_buffer(3).end_on::<Done>(),
    );

    for i in 0..10 {
        emitter.emit::<Sample>(i).await?;
    }
    emitter.signal::<Done>().await?;

    while let Some(sample) = samples.next().await {
        println!("pulled: {}", sample?);
    }
    println!("stream exhausted");
    Ok(())
}
