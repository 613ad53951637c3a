use core::{future::Future, time::Duration};

/// A trait that abstracts over how to wait for a given [`Duration`] in async
/// contexts.
///
/// The producer paces itself through this trait so the pacing strategy can be
/// swapped without touching the emission loop.
pub trait SleepProvider {
    /// We require `Send` so that the producer stream can be handed to a
    /// multi-threaded HTTP server.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the default provider. Under a paused Tokio clock the timer
/// auto-advances, which keeps timing tests deterministic.
pub struct TokioSleep;

impl SleepProvider for TokioSleep {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(dur)
    }
}

/// An implementation of [`SleepProvider`] using Tokio's yield.
///
/// Ignores the requested duration and only yields to the scheduler, turning
/// the producer into an unpaced firehose. Useful for benchmarks.
pub struct TokioYield;

impl SleepProvider for TokioYield {
    fn sleep_for(_dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::task::yield_now()
    }
}
