//! HTTP handlers and the state they share.
//!
//! - [`handler`]: the streaming endpoint.
//! - [`actions`]: the small request/response endpoints.
//! - [`state`]: shutdown flag, stream accounting and configuration.

pub mod actions;
pub mod handler;
pub mod state;
