/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors surfaced by connectors and the stream consumer.
///
/// The producer side is infallible: it either yields the next chunk or
/// completes. Everything here belongs to the reading end of a connection.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The connection could not be opened.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The peer answered, but not with a readable byte stream.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The connection broke while a chunk was being read.
    ///
    /// The consumer treats this as end of stream rather than a fatal error.
    #[error("transport error: {0}")]
    Transport(String),

    /// [`StreamConsumer::start`](crate::StreamConsumer::start) was called on a
    /// consumer that already left the idle state.
    #[error("consumer already started")]
    AlreadyStarted,
}
