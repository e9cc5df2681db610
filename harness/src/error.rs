//! Error types for the sandbox harness.

use std::time::Duration;

use sandbox_common::crypto::KeyError;
use sandbox_common::outcome::{ExecutionFailure, OutcomeError};
use sandbox_common::rpc::RpcError;
use thiserror::Error;

/// Error type covering every harness operation.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// No usable validator binary was found.
    #[error("sandbox binary not found (tried: {tried})")]
    BinaryNotFound {
        /// Human-readable list of the sources that were tried.
        tried: String,
    },

    /// No free port could be picked for the sandbox.
    #[error("no free port available")]
    NoFreePort,

    /// The one-time `init` subcommand failed.
    #[error("sandbox init failed: {stderr}")]
    InitFailed {
        /// Captured stderr of the subcommand.
        stderr: String,
    },

    /// A one-shot sandbox subcommand exited non-zero.
    #[error("sandbox command `{command}` failed: {stderr}")]
    CommandFailed {
        /// The subcommand and its arguments.
        command: String,
        /// Captured stderr of the subcommand.
        stderr: String,
    },

    /// The process never became healthy within the startup budget.
    #[error("sandbox did not become healthy within {timeout:?}; stderr: {stderr}")]
    StartupTimeout {
        /// The budget that elapsed.
        timeout: Duration,
        /// Captured stderr of the process.
        stderr: String,
    },

    /// The process exited while the harness was waiting for it.
    #[error("sandbox process exited during startup; stderr: {stderr}")]
    ProcessDied {
        /// Captured stderr of the process.
        stderr: String,
    },

    /// The execution context could not run the operation.
    #[error("execution context unavailable: {0}")]
    Bridge(String),

    /// A network operation failed below the decode layer.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// An account operation failed; carries the account it targeted.
    #[error("account operation failed for `{account_id}`: {source}")]
    Account {
        /// Account id the operation was about.
        account_id: String,
        /// Underlying failure.
        #[source]
        source: Box<HarnessError>,
    },

    /// Sender id that this client has no signing identity for.
    #[error("unknown account `{0}`; create it through this client first")]
    UnknownAccount(String),

    /// A state-changing call failed remotely; the expected, assertable case.
    #[error(transparent)]
    ExecutionFailed(Box<ExecutionFailure>),

    /// An execution trace could not be decoded.
    #[error("malformed execution outcome: {0}")]
    MalformedOutcome(#[from] OutcomeError),

    /// State restore did not apply; recoverable: callers may fall back to a
    /// full reset.
    #[error("state restore failed: {0}")]
    RestoreFailed(#[source] RpcError),

    /// Key material could not be read or parsed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// A state snapshot could not be produced or parsed.
    #[error("state snapshot error: {0}")]
    Snapshot(String),

    /// A response field failed to parse into the expected shape.
    #[error("malformed response field: {0}")]
    Malformed(String),

    /// Filesystem or process I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failure outside the RPC layer.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Wrap an error with the account id it concerned.
    pub fn for_account(account_id: impl Into<String>, source: HarnessError) -> Self {
        HarnessError::Account {
            account_id: account_id.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
