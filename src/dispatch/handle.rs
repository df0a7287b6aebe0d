//! Completion handle returned by `emit`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::EmitError;

/// Future settling once every listener of one emit call has finished.
///
/// Resolves `Ok(())` when all listeners succeeded and rejects with the first
/// listener failure otherwise. Dropping the handle does **not** cancel the
/// dispatch; the emit is processed either way (fire-and-forget).
pub struct EmitHandle {
    event: &'static str,
    rx: oneshot::Receiver<Result<(), EmitError>>,
}

impl EmitHandle {
    /// Creates the sender/handle pair for one emit request.
    pub(crate) fn channel(
        event: &'static str,
    ) -> (oneshot::Sender<Result<(), EmitError>>, EmitHandle) {
        let (tx, rx) = oneshot::channel();
        (tx, EmitHandle { event, rx })
    }

    /// Name of the emitted event.
    pub fn event(&self) -> &'static str {
        self.event
    }
}

impl Future for EmitHandle {
    type Output = Result<(), EmitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(EmitError::Abandoned { event: this.event })),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for EmitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitHandle").field("event", &self.event).finish()
    }
}
