//! Server-side components of `tickstream-server`.
//!
//! ## Submodules
//!
//! - [`app`] - Router wiring.
//! - [`config`] - CLI/env configuration.
//! - [`service`] - Handlers and shared state.
//! - [`streaming`] - Response body plumbing.
//! - [`telemetry`] - Logging and optional OpenTelemetry export.

pub mod app;
pub mod config;
pub mod service;
pub mod streaming;
pub mod telemetry;

#[cfg(test)]
mod tests;
