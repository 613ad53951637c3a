use core::{future::Future, time::Duration};

use bytes::Bytes;
use futures::{Stream, StreamExt, stream::BoxStream};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    producer::{DEFAULT_INTERVAL, SequenceProducer},
};

/// Opens the byte stream a [`StreamConsumer`](crate::StreamConsumer) reads.
///
/// Each call to [`connect`](Connector::connect) is a new connection with its
/// own producer on the far side.
pub trait Connector {
    /// The readable half of an open connection.
    type Body: Stream<Item = Result<Bytes>>;

    fn connect(&self) -> impl Future<Output = Result<Self::Body>>;
}

/// In-process connector that runs a fresh [`SequenceProducer`] per
/// connection.
///
/// Every producer is driven by a child of the loopback's token, so
/// [`Loopback::shutdown`] ends all open connections at once.
#[derive(Debug, Clone)]
pub struct Loopback {
    interval: Duration,
    token: CancellationToken,
}

impl Loopback {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            token: CancellationToken::new(),
        }
    }

    /// Completes every stream opened through this loopback.
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl Connector for Loopback {
    type Body = BoxStream<'static, Result<Bytes>>;

    async fn connect(&self) -> Result<Self::Body> {
        let producer = SequenceProducer::new(self.interval, self.token.child_token());
        Ok(producer
            .into_stream()
            .map(|chunk| match chunk {
                Ok(chunk) => Ok(chunk),
                Err(never) => match never {},
            })
            .boxed())
    }
}
