use crate::server::{service::state::StreamGuard, telemetry::increment_items_emitted};
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use futures::Stream;

pin_project_lite::pin_project! {
    /// Response body wrapper that keeps a [`StreamGuard`] alive for as long
    /// as the HTTP layer holds the body.
    ///
    /// Hyper drops the body when the client disconnects, which releases the
    /// guard and with it the stream slot, the producer and its timer.
    pub struct TrackedStream<S> {
        #[pin]
        inner: S,
        guard: StreamGuard,
    }
}

impl<S> TrackedStream<S> {
    pub const fn new(inner: S, guard: StreamGuard) -> Self {
        Self { inner, guard }
    }
}

impl<S, T, E> Stream for TrackedStream<S>
where
    S: Stream<Item = Result<T, E>>,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.inner.poll_next(cx) {
            Poll::Ready(Some(item)) => {
                if item.is_ok() {
                    this.guard.record_item();
                    increment_items_emitted();
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                this.guard.complete();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
