//! Asynchronous JSON-RPC 2.0 client for the sandbox validator.

mod client;
mod error;

pub use client::*;
pub use error::*;

/// Protocol version stamped on every request.
pub const JSON_RPC_VERSION: &str = "2.0";
