use reqwest::StatusCode;

pub type Result<T> = core::result::Result<T, ClientError>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// The server answered with a structured error.
    #[error(transparent)]
    Server(#[from] tickstream_wire::Error),

    /// The request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status and no readable body.
    #[error("unexpected response status {0}")]
    Status(StatusCode),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}
