//! Streaming endpoint.
//!
//! Every `GET` on the stream path gets its own [`SequenceProducer`] whose
//! token is a child of the server's shutdown token. The producer is adapted
//! into a pull-based body: hyper asks for the next chunk only when it can
//! write it, so a slow client never causes items to pile up in memory.

use crate::server::{
    service::state::AppState,
    streaming::tracked::TrackedStream,
    telemetry::{increment_requests, increment_streams_refused},
};
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tickstream::SequenceProducer;
use tickstream_wire::{Error, STREAM_CONTENT_TYPE, STREAM_PATH};

/// Opens a paced integer stream: `1\n` right away, then one more line per
/// tick until the server shuts down or the client goes away.
#[tracing::instrument(skip_all)]
pub async fn stream_sequence(State(state): State<AppState>) -> Result<Response, Error> {
    increment_requests(STREAM_PATH);

    let guard = state.service.try_open_stream().inspect_err(|e| {
        increment_streams_refused();
        tracing::warn!("Refusing stream: {e}");
    })?;

    tracing::info!(stream = guard.id(), "streaming");

    let producer = SequenceProducer::new(state.config.tick_interval, state.service.stream_token());
    let body = Body::from_stream(TrackedStream::new(producer.into_stream(), guard));

    Ok((
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}
