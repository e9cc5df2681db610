//! Shared building blocks for the sandbox test harness.
//!
//! This crate holds everything that talks the validator's language but knows
//! nothing about process management or test orchestration:
//!
//! - [`crypto`]: ed25519 key pairs, the `ed25519:<base58>` encoding and the
//!   `validator_key.json` key file format
//! - [`types`]: transaction/action wire types and deserialized views of
//!   execution outcomes
//! - [`outcome`]: decoding of raw execution traces into a success value or a
//!   structured failure report
//! - [`rpc`]: the asynchronous JSON-RPC 2.0 client used for every network
//!   operation

pub mod crypto;
pub mod outcome;
pub mod rpc;
pub mod types;

pub use outcome::{CallOutcome, ExecutionFailure, OutcomeError};
pub use rpc::{RpcClient, RpcError, RpcResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
