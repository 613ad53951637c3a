//! # HTTP contract
//!
//! - [`paths`]: route paths and the stream content type
//! - [`payload`]: request and response bodies of the actions
//! - [`error`]: the error type carried in failed responses

pub mod error;
pub mod paths;
pub mod payload;

pub use error::*;
pub use paths::*;
pub use payload::*;
