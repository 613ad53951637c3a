//! Small request/response endpoints served next to the stream.
//!
//! Each action logs its parameters and its result, the same way for success
//! and failure, so the server log shows what every call did.

use crate::server::{service::state::AppState, telemetry::increment_requests};
use axum::{
    Form, Json,
    extract::{
        State,
        rejection::{FormRejection, JsonRejection},
    },
};
use chrono::{SecondsFormat, Utc};
use tickstream_wire::{
    Error, HEALTH_PATH, INCREMENT_PATH, IncrementRequest, IncrementResponse, SERVER_DATE_PATH,
    SUBMIT_FORM_PATH, ServerDateResponse, SubmitFormResponse, THROW_ERROR_PATH,
};
use tokio::time::sleep;

/// Message of the deliberately failing action.
pub const THROWN_ERROR_MESSAGE: &str = "Error thrown from action";

/// Returns `number + 1`.
#[tracing::instrument(skip_all)]
pub async fn increment(
    payload: Result<Json<IncrementRequest>, JsonRejection>,
) -> Result<Json<IncrementResponse>, Error> {
    increment_requests(INCREMENT_PATH);

    let Json(request) = payload.map_err(|rejection| {
        log_action_error(Error::InvalidRequest {
            reason: rejection.body_text(),
        })
    })?;
    tracing::info!(params = ?request, "increment");

    let number = request.number.checked_add(1).ok_or_else(|| {
        log_action_error(Error::InvalidRequest {
            reason: format!("{} cannot be incremented without overflow", request.number),
        })
    })?;

    let response = IncrementResponse { number };
    tracing::info!(returns = ?response, "increment");
    Ok(Json(response))
}

/// Always fails.
#[tracing::instrument(skip_all)]
pub async fn throw_error() -> Result<Json<()>, Error> {
    increment_requests(THROW_ERROR_PATH);

    Err(log_action_error(Error::ActionFailed {
        message: THROWN_ERROR_MESSAGE.to_string(),
    }))
}

/// Server wall clock, answered after `date_delay`.
#[tracing::instrument(skip_all)]
pub async fn server_date(State(state): State<AppState>) -> Json<ServerDateResponse> {
    increment_requests(SERVER_DATE_PATH);

    sleep(state.config.date_delay).await;
    let date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    tracing::debug!(%date, "server date");
    Json(ServerDateResponse { date })
}

/// Accepts any urlencoded fields, logs them and answers after `submit_delay`.
#[tracing::instrument(skip_all)]
pub async fn submit_form(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Json<SubmitFormResponse>, Error> {
    increment_requests(SUBMIT_FORM_PATH);

    let Form(fields) = form.map_err(|rejection| {
        log_action_error(Error::InvalidRequest {
            reason: rejection.body_text(),
        })
    })?;

    for (name, value) in &fields {
        tracing::info!(%name, %value, "form field");
    }

    sleep(state.config.submit_delay).await;
    tracing::info!(fields = fields.len(), "form submitted");
    Ok(Json(SubmitFormResponse { success: true }))
}

pub async fn healthz(State(state): State<AppState>) -> Result<&'static str, Error> {
    increment_requests(HEALTH_PATH);

    if state.service.is_shutting_down() {
        return Err(Error::ServiceShutdown);
    }
    Ok("ok")
}

fn log_action_error(err: Error) -> Error {
    tracing::error!("Action error: {err}");
    err
}
