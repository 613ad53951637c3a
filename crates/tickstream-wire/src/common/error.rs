//! Error types shared by the tickstream server and client.
//!
//! The server turns an [`Error`] into an HTTP status plus an [`ErrorBody`];
//! the client turns the body back into the same [`Error`].
//!
//! ## Error Cases
//! - `InvalidRequest`: the request was malformed or out of range (400).
//! - `ActionFailed`: the action ran and failed (500).
//! - `ServiceOverloaded`: too many concurrent streams (503).
//! - `ServiceShutdown`: the request arrived while the server was shutting
//!   down (503).

use serde::{Deserialize, Serialize};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The request was invalid or exceeded constraints.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The action itself failed.
    #[error("{message}")]
    ActionFailed { message: String },

    /// The server cannot take more streams right now.
    #[error("Service is overloaded: {details}")]
    ServiceOverloaded { details: String },

    /// The server is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

/// Machine-readable discriminant of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    ActionFailed,
    ServiceOverloaded,
    ServiceShutdown,
}

/// JSON body of every failed action or refused stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason, e.g. `"Error thrown from action"`.
    pub error: String,
    pub code: ErrorCode,
}

impl Error {
    /// HTTP status the server answers with.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::ActionFailed { .. } => 500,
            Self::ServiceOverloaded { .. } | Self::ServiceShutdown => 503,
        }
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Self::ActionFailed { .. } => ErrorCode::ActionFailed,
            Self::ServiceOverloaded { .. } => ErrorCode::ServiceOverloaded,
            Self::ServiceShutdown => ErrorCode::ServiceShutdown,
        }
    }

    /// The variant's own text, without the display prefix.
    fn detail(&self) -> String {
        match self {
            Self::InvalidRequest { reason } => reason.clone(),
            Self::ActionFailed { message } => message.clone(),
            Self::ServiceOverloaded { details } => details.clone(),
            Self::ServiceShutdown => self.to_string(),
        }
    }
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            error: err.detail(),
            code: err.code(),
        }
    }
}

impl From<ErrorBody> for Error {
    fn from(body: ErrorBody) -> Self {
        match body.code {
            ErrorCode::InvalidRequest => Self::InvalidRequest { reason: body.error },
            ErrorCode::ActionFailed => Self::ActionFailed {
                message: body.error,
            },
            ErrorCode::ServiceOverloaded => Self::ServiceOverloaded {
                details: body.error,
            },
            ErrorCode::ServiceShutdown => Self::ServiceShutdown,
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        use axum::{Json, http::StatusCode};

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}
