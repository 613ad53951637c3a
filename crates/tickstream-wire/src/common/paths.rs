/// The paced integer stream.
pub const STREAM_PATH: &str = "/streaming/api";

/// Content type of the stream body. The body is UTF-8 text, but it is sent as
/// an opaque byte stream so no intermediary buffers or re-encodes it.
pub const STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// `POST`, JSON [`IncrementRequest`](crate::IncrementRequest).
pub const INCREMENT_PATH: &str = "/actions/increment";

/// `POST`, always fails.
pub const THROW_ERROR_PATH: &str = "/actions/throw-error";

/// `GET`, delayed server clock.
pub const SERVER_DATE_PATH: &str = "/actions/server-date";

/// `POST`, urlencoded form fields.
pub const SUBMIT_FORM_PATH: &str = "/actions/submit-form";

pub const HEALTH_PATH: &str = "/healthz";

/// Address the server binds to unless configured otherwise.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

/// Base URL the client talks to unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
