//! Shared server state.
//!
//! [`ServiceState`] is the only thing open streams have in common: the
//! shutdown token every producer's token descends from, the shutting-down
//! flag, and the count of streams in flight. Everything else (counter,
//! timer, decoder) is private to a single connection.

use crate::server::{
    config::ServerConfig,
    telemetry::{
        decrement_streams_inflight, increment_streams_inflight, record_stream_closed,
        record_stream_duration,
    },
};
use core::time::Duration;
use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::{sync::Arc, time::Instant};
use tickstream_wire::Error;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Poll period while waiting for in-flight streams to drain.
const DRAIN_POLL: Duration = Duration::from_millis(100);

/// State handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub service: Arc<ServiceState>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let service = ServiceState::new(config.max_streams);
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
        }
    }
}

#[derive(Debug)]
pub struct ServiceState {
    shutdown_token: CancellationToken,
    shutting_down: AtomicBool,
    streams_inflight: AtomicUsize,
    next_stream_id: AtomicU64,
    max_streams: Option<usize>,
}

impl ServiceState {
    pub fn new(max_streams: Option<usize>) -> Self {
        Self {
            shutdown_token: CancellationToken::new(),
            shutting_down: AtomicBool::new(false),
            streams_inflight: AtomicUsize::new(0),
            next_stream_id: AtomicU64::new(1),
            max_streams,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    pub fn streams_inflight(&self) -> usize {
        self.streams_inflight.load(Ordering::Acquire)
    }

    /// A token that is cancelled when the server shuts down. Each stream gets
    /// its own child so it can also be stopped on its own.
    pub fn stream_token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    /// Reserves a slot for a new stream.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once shutdown has begun.
    /// - [`Error::ServiceOverloaded`] if `max_streams` streams are already
    ///   open.
    pub fn try_open_stream(self: &Arc<Self>) -> Result<StreamGuard, Error> {
        if self.is_shutting_down() {
            return Err(Error::ServiceShutdown);
        }

        let max_streams = self.max_streams;
        let reserved =
            self.streams_inflight
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| match max_streams {
                    Some(max) if open >= max => None,
                    _ => Some(open + 1),
                });

        if reserved.is_err() {
            return Err(Error::ServiceOverloaded {
                details: format!(
                    "{} concurrent streams already open",
                    max_streams.unwrap_or_default()
                ),
            });
        }

        increment_streams_inflight();
        let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(stream = id, "stream opened");

        Ok(StreamGuard {
            state: Arc::clone(self),
            id,
            started: Instant::now(),
            items: 0,
            completed: false,
        })
    }

    /// Stops accepting streams, completes every open one and waits up to
    /// `drain_timeout` for them to be released.
    ///
    /// Returns the number of streams still open when the wait ended.
    pub async fn shutdown(&self, drain_timeout: Duration) -> usize {
        // === Phase 0: Stop accepting new streams ===
        tracing::info!("Refusing new streams");
        self.shutting_down.store(true, Ordering::Release);

        // === Phase 1: Complete every open stream ===
        tracing::debug!("Cancelling open streams via shutdown token");
        self.shutdown_token.cancel();

        // === Phase 2: Wait for the streams to be released ===
        tracing::info!(
            "Draining in-flight streams ({} active)",
            self.streams_inflight()
        );
        let drained = timeout(drain_timeout, async {
            while self.streams_inflight() > 0 {
                sleep(DRAIN_POLL).await;
            }
        })
        .await;

        let remaining = self.streams_inflight();
        match drained {
            Ok(()) => tracing::debug!("All in-flight streams drained successfully"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} streams still active)",
                remaining
            ),
        }
        remaining
    }
}

/// How a stream's slot was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server ended the stream (shutdown or exhausted sequence).
    Completed,
    /// The client went away first. This is how most streams end.
    Disconnected,
}

impl StreamEnd {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Holds one stream slot until dropped.
///
/// Dropping a guard that was never marked complete means the client went
/// away mid-stream.
#[derive(Debug)]
pub struct StreamGuard {
    state: Arc<ServiceState>,
    id: u64,
    started: Instant,
    items: u64,
    completed: bool,
}

impl StreamGuard {
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[cfg(test)]
    pub const fn items(&self) -> u64 {
        self.items
    }

    pub const fn record_item(&mut self) {
        self.items += 1;
    }

    /// Marks the stream as ended by the server rather than the client.
    pub const fn complete(&mut self) {
        self.completed = true;
    }

    pub const fn end(&self) -> StreamEnd {
        if self.completed {
            StreamEnd::Completed
        } else {
            StreamEnd::Disconnected
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.state.streams_inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();

        let elapsed = self.started.elapsed();
        record_stream_duration(elapsed.as_secs_f64() * 1000.0);

        let end = self.end();
        record_stream_closed(end.as_str());
        let message = match end {
            StreamEnd::Completed => "stream completed",
            StreamEnd::Disconnected => "client disconnected",
        };
        tracing::info!(stream = self.id, items = self.items, ?elapsed, "{message}");
    }
}
