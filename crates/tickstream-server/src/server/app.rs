use crate::server::service::{
    actions::{healthz, increment, server_date, submit_form, throw_error},
    handler::stream_sequence,
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};
use tickstream_wire::{
    HEALTH_PATH, INCREMENT_PATH, SERVER_DATE_PATH, STREAM_PATH, SUBMIT_FORM_PATH,
    THROW_ERROR_PATH,
};
use tower_http::cors::{Any, CorsLayer};

/// Builds the router serving the stream, the actions and the health check.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route(STREAM_PATH, get(stream_sequence))
        .route(INCREMENT_PATH, post(increment))
        .route(THROW_ERROR_PATH, post(throw_error))
        .route(SERVER_DATE_PATH, get(server_date))
        .route(SUBMIT_FORM_PATH, post(submit_form))
        .route(HEALTH_PATH, get(healthz))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
