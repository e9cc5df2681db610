//! Convenient re-exports for test code.
//!
//! ```rust,ignore
//! use sandbox_harness::prelude::*;
//! ```

pub use crate::bridge::AsyncBridge;
pub use crate::client::ChainClient;
pub use crate::config::SandboxConfig;
pub use crate::error::{HarnessError, HarnessResult};
pub use crate::handles::{Account, Contract};
pub use crate::sandbox::{Sandbox, SandboxBuilder, StateSnapshot};

pub use sandbox_common::crypto::{KeyFile, KeyPair};
pub use sandbox_common::outcome::{CallOutcome, ExecutionFailure};
pub use sandbox_common::rpc::{RpcClient, RpcError};

pub use serde_json::json;
