//! Paced, pull-based sequence producer.
//!
//! A [`SequenceProducer`] owns one [`Sequence`] and hands out its items one
//! pull at a time. The first pull answers immediately; every later pull first
//! waits for the configured interval. The wait races a [`CancellationToken`],
//! so cancelling the token (or dropping the producer) stops the timer right
//! away instead of leaving a dangling loop behind.
//!
//! [`SequenceProducer::into_stream`] adapts the pull operation into a
//! [`Stream`]. The stream does no work until it is polled, which is how the
//! HTTP body asks for more data: a slow reader simply stops pulling.

use core::{convert::Infallible, marker::PhantomData, time::Duration};

use bytes::Bytes;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::{
    sequence::Sequence,
    sleep::{SleepProvider, TokioSleep},
};

/// Default pause between two emitted items.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Outcome of a single [`SequenceProducer::pull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullStatus {
    /// The next encoded item is available.
    Ready {
        /// `"<n>\n"` as bytes.
        chunk: Bytes,
    },
    /// The producer will not emit anything else, either because it was
    /// cancelled or because its counter is exhausted.
    Complete,
}

impl PullStatus {
    /// Returns the chunk of a [`PullStatus::Ready`].
    ///
    /// # Panics
    ///
    /// Panics on [`PullStatus::Complete`].
    #[track_caller]
    pub fn unwrap_ready(self) -> Bytes {
        match self {
            Self::Ready { chunk } => chunk,
            Self::Complete => panic!("called `PullStatus::unwrap_ready()` on `Complete`"),
        }
    }

    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Per-connection producer of the paced integer sequence.
///
/// The counter is private to the instance: create one producer per
/// connection and no two connections can observe each other's values.
#[derive(Debug)]
pub struct SequenceProducer<S = TokioSleep> {
    sequence: Sequence,
    interval: Duration,
    token: CancellationToken,
    emitted: u64,
    complete: bool,
    _sleep: PhantomData<fn() -> S>,
}

impl SequenceProducer<TokioSleep> {
    /// Creates a producer paced by Tokio's timer.
    pub fn new(interval: Duration, token: CancellationToken) -> Self {
        Self::with_sleep_provider(interval, token)
    }
}

impl<S> SequenceProducer<S>
where
    S: SleepProvider,
{
    /// Creates a producer paced by an explicit [`SleepProvider`].
    pub fn with_sleep_provider(interval: Duration, token: CancellationToken) -> Self {
        Self::from_sequence(Sequence::new(), interval, token)
    }

    pub(crate) const fn from_sequence(
        sequence: Sequence,
        interval: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            sequence,
            interval,
            token,
            emitted: 0,
            complete: false,
            _sleep: PhantomData,
        }
    }

    /// Number of items handed out so far.
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// The token that stops this producer.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Produces the next chunk, waiting for the interval first unless this is
    /// the very first pull.
    ///
    /// Once [`PullStatus::Complete`] has been returned, every later pull
    /// returns it again without waiting.
    pub async fn pull(&mut self) -> PullStatus {
        if self.complete {
            return PullStatus::Complete;
        }

        if self.emitted > 0 {
            tokio::select! {
                biased;
                () = self.token.cancelled() => return self.finish("cancelled"),
                () = S::sleep_for(self.interval) => {}
            }
        } else if self.token.is_cancelled() {
            return self.finish("cancelled");
        }

        match self.sequence.next_item() {
            Some(item) => {
                self.emitted += 1;

                #[cfg(feature = "tracing")]
                tracing::trace!(value = item.value(), "emitting item");

                PullStatus::Ready {
                    chunk: item.encode(),
                }
            }
            None => self.finish("exhausted"),
        }
    }

    fn finish(&mut self, _reason: &'static str) -> PullStatus {
        self.complete = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(reason = _reason, emitted = self.emitted, "producer complete");

        PullStatus::Complete
    }
}

impl<S> SequenceProducer<S>
where
    S: SleepProvider + 'static,
{
    /// Adapts the producer into a lazily pulled byte stream.
    ///
    /// The stream yields one chunk per poll-to-ready and ends when the
    /// producer completes. Dropping the stream drops any pending wait.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        futures::stream::unfold(self, |mut producer| async move {
            match producer.pull().await {
                PullStatus::Ready { chunk } => Some((Ok(chunk), producer)),
                PullStatus::Complete => None,
            }
        })
    }
}
