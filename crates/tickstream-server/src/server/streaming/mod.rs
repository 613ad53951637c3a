//! Response body plumbing for the sequence stream.

pub mod tracked;
