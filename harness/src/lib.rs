//! # Sandbox Test Harness
//!
//! Synchronous, deterministic control over a locally spawned blockchain
//! validator and its chain client, for exercising smart-contract programs
//! from plain test code.
//!
//! ## Architecture Overview
//!
//! Two subsystems, composed bottom-up:
//!
//! - **Process lifecycle**: [`supervisor`] owns the validator child process
//!   (spawn, health polling, group shutdown); [`sandbox`] layers the domain
//!   operations on top (reset-to-genesis, state snapshot and restore) and
//!   exposes everything synchronously.
//! - **Chain client**: [`bridge`] runs async chain operations to completion
//!   on one persistent execution context; [`accounts`] caches signing
//!   identities; [`client`] composes both into call/view/deploy/transfer
//!   operations with decoded outcomes; [`handles`] are the ergonomic
//!   test-facing wrappers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sandbox_harness::prelude::*;
//!
//! let sandbox = Sandbox::start_default()?;
//! let client = ChainClient::connect(&sandbox)?;
//!
//! let alice = client.create_account("alice", None)?;
//! let counter = client.create_account("counter", None)?;
//! counter.deploy_file("res/counter.wasm")?;
//!
//! let outcome = counter.as_contract().call_as(&alice, "increment", json!({}))?;
//! assert_eq!(outcome.into_result()?, "1");
//! ```
//!
//! ## State isolation
//!
//! Snapshot/restore ([`Sandbox::dump_state`] / [`Sandbox::restore_state`])
//! is the default per-test isolation mechanism; a full
//! [`Sandbox::reset_state`] restarts the process and is the explicit opt-in
//! for tests that need a pristine chain.

#![warn(missing_docs)]

/// Signing identities and the per-client account cache
pub mod accounts;
/// Validator binary resolution
pub mod binary;
/// Sync-over-async execution bridge
pub mod bridge;
/// The synchronous chain client
pub mod client;
/// Defaults, constants and environment knobs
pub mod config;
/// Harness-wide error type
pub mod error;
/// Test-facing account and contract handles
pub mod handles;
/// Convenient re-exports for common usage
pub mod prelude;
/// Synchronous sandbox control surface
pub mod sandbox;
/// Validator process supervision
pub mod supervisor;

pub use bridge::AsyncBridge;
pub use client::ChainClient;
pub use error::{HarnessError, HarnessResult};
pub use handles::{Account, Contract};
pub use sandbox::{Sandbox, SandboxBuilder, StateSnapshot};

// Re-exported so downstream test code rarely needs sandbox_common directly.
pub use sandbox_common::crypto::{KeyFile, KeyPair};
pub use sandbox_common::outcome::{CallOutcome, ExecutionFailure};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
