//! Client-side components of the `tickstream` binary.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/env configuration and subcommands.
//! - [`error`] - Errors of the action calls.
//! - [`http`] - reqwest-backed stream connector and action client.
//! - [`commands`] - One function per subcommand.

pub mod commands;
pub mod config;
pub mod error;
pub mod http;
