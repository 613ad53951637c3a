//! Incremental stream consumer.
//!
//! A [`StreamConsumer`] does nothing until [`StreamConsumer::start`] is
//! called. It then walks through
//!
//! ```text
//! Idle -> Connecting -> Reading (one step per chunk) -> Closed | Aborted
//! ```
//!
//! appending each decoded chunk to its [`DisplayBuffer`] as soon as it
//! arrives. A broken transport counts as a normal close: whatever was read
//! stays in the buffer. Aborting through an [`AbortHandle`] drops the read
//! handle before `start` returns and is not reported as an error.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    codec::Utf8StreamDecoder,
    connector::Connector,
    error::{Error, Result},
};

/// Lifecycle of a [`StreamConsumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumerState {
    /// Created, no I/O performed yet.
    Idle,
    /// Waiting for the connection to open.
    Connecting,
    /// Reading chunks.
    Reading,
    /// The stream ended, or the transport failed.
    Closed,
    /// The caller gave up on the stream.
    Aborted,
}

impl ConsumerState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }
}

/// Append-only text accumulated from a stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisplayBuffer {
    text: String,
}

impl DisplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Cloneable handle that aborts a running (or not yet started) consumer.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Summary of a finished [`StreamConsumer::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeReport {
    /// Terminal state: [`ConsumerState::Closed`] or [`ConsumerState::Aborted`].
    pub state: ConsumerState,
    /// Chunks received from the transport.
    pub chunks: usize,
    /// Raw bytes received from the transport.
    pub bytes: usize,
}

/// Reads a byte stream chunk by chunk and accumulates its decoded text.
#[derive(Debug)]
pub struct StreamConsumer<C> {
    connector: C,
    state: ConsumerState,
    buffer: DisplayBuffer,
    abort: CancellationToken,
}

impl<C> StreamConsumer<C>
where
    C: Connector,
{
    /// Wraps `connector` without opening a connection.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            state: ConsumerState::Idle,
            buffer: DisplayBuffer::new(),
            abort: CancellationToken::new(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            token: self.abort.clone(),
        }
    }

    pub const fn state(&self) -> ConsumerState {
        self.state
    }

    /// Everything decoded so far.
    pub fn output(&self) -> &str {
        self.buffer.as_str()
    }

    pub const fn buffer(&self) -> &DisplayBuffer {
        &self.buffer
    }

    pub fn into_output(self) -> String {
        self.buffer.into_string()
    }

    /// Opens the connection and reads until the stream closes or the consumer
    /// is aborted.
    ///
    /// `on_chunk` receives each piece of newly decoded text right after it is
    /// appended to the buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if the consumer is not idle.
    /// - The connector's error if the connection cannot be opened; the
    ///   consumer is then [`ConsumerState::Closed`].
    ///
    /// Transport failures after the connection opened are not errors: they
    /// close the stream and keep the output read so far.
    pub async fn start<F>(&mut self, mut on_chunk: F) -> Result<ConsumeReport>
    where
        F: FnMut(&str),
    {
        if self.state != ConsumerState::Idle {
            return Err(Error::AlreadyStarted);
        }

        let abort = self.abort.clone();
        self.state = ConsumerState::Connecting;

        #[cfg(feature = "tracing")]
        tracing::debug!("connecting");

        let body = tokio::select! {
            biased;
            () = abort.cancelled() => {
                self.state = ConsumerState::Aborted;
                return Ok(self.report(0, 0));
            }
            body = self.connector.connect() => match body {
                Ok(body) => body,
                Err(e) => {
                    self.state = ConsumerState::Closed;
                    return Err(e);
                }
            },
        };

        self.state = ConsumerState::Reading;
        let mut decoder = Utf8StreamDecoder::new();

        // The read handle lives only inside this block, so it is released
        // before any report goes back to the caller.
        let (chunks, bytes) = {
            let mut body = core::pin::pin!(body);
            let mut chunks = 0;
            let mut bytes = 0;

            loop {
                let next = tokio::select! {
                    biased;
                    () = abort.cancelled() => {
                        self.state = ConsumerState::Aborted;
                        break;
                    }
                    next = body.next() => next,
                };

                match next {
                    Some(Ok(chunk)) => {
                        chunks += 1;
                        bytes += chunk.len();
                        let text = decoder.decode(&chunk);
                        if !text.is_empty() {
                            self.buffer.append(&text);
                            on_chunk(&text);
                        }
                    }
                    Some(Err(_e)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("treating transport failure as end of stream: {_e}");
                        self.state = ConsumerState::Closed;
                        break;
                    }
                    None => {
                        self.state = ConsumerState::Closed;
                        break;
                    }
                }
            }

            (chunks, bytes)
        };

        if self.state == ConsumerState::Closed {
            let tail = decoder.finish();
            if !tail.is_empty() {
                self.buffer.append(&tail);
                on_chunk(&tail);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(state = ?self.state, chunks, bytes, "stream finished");

        Ok(self.report(chunks, bytes))
    }

    const fn report(&self, chunks: usize, bytes: usize) -> ConsumeReport {
        ConsumeReport {
            state: self.state,
            chunks,
            bytes,
        }
    }
}
