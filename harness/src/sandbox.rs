//! Synchronous control surface over the supervised validator.
//!
//! [`Sandbox`] pairs the async [`Supervisor`] with an [`AsyncBridge`] so test
//! code gets plain blocking calls, and adds the two state-isolation
//! mechanisms: full reset-to-genesis and snapshot/restore.
//!
//! Snapshot/restore is the intended default for per-test isolation: it is
//! fast and keeps the process alive. `reset_state` is the explicit opt-in
//! for tests that need a pristine chain and accept a process restart. Mixing
//! both in one test suite is safe only if snapshots are re-taken after every
//! reset.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use sandbox_common::crypto::KeyFile;
use sandbox_common::rpc::RpcClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::bridge::AsyncBridge;
use crate::config::SandboxConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::supervisor::Supervisor;

/// Immutable, ordered export of the full ledger state at one instant.
///
/// Captured by [`Sandbox::dump_state`]; consumed read-only by
/// [`Sandbox::restore_state`]. A restore is all-or-nothing per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    records: Vec<Value>,
}

impl StateSnapshot {
    /// Build a snapshot from raw records (e.g. loaded from disk).
    pub fn from_records(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// The captured records, in export order.
    pub fn records(&self) -> &[Value] {
        &self.records
    }

    /// Number of captured records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Builder for [`Sandbox`] instances.
///
/// # Example
///
/// ```rust,ignore
/// let sandbox = Sandbox::builder()
///     .with_rpc_port(3030)
///     .with_chain_id("localnet")
///     .build()?;
/// sandbox.start()?;
/// ```
pub struct SandboxBuilder {
    config: SandboxConfig,
}

impl SandboxBuilder {
    /// Builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: SandboxConfig::default(),
        }
    }

    /// Builder seeded from the `SANDBOX_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            config: SandboxConfig::from_env(),
        }
    }

    /// Use a caller-owned home directory (never deleted by the harness).
    pub fn with_home_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.home_dir = Some(path.into());
        self
    }

    /// Pin the RPC port instead of picking a free one.
    pub fn with_rpc_port(mut self, port: u16) -> Self {
        self.config.rpc_port = Some(port);
        self
    }

    /// Use an explicit validator binary.
    pub fn with_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.binary_path = Some(path.into());
        self
    }

    /// Chain id passed to `init`.
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.config.chain_id = chain_id.into();
        self
    }

    /// Startup budget.
    pub fn with_startup_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.startup_timeout = timeout;
        self
    }

    /// Startup probe interval.
    pub fn with_poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Build the sandbox. Nothing is spawned until `start()`.
    pub fn build(self) -> HarnessResult<Sandbox> {
        let supervisor = Supervisor::new(self.config.clone())?;
        let endpoint = supervisor.rpc_endpoint();
        let rpc_port = supervisor.rpc_port();
        let home_dir = supervisor.home_dir().to_path_buf();
        let rpc = Arc::new(RpcClient::new(&endpoint)?);

        Ok(Sandbox {
            supervisor: Arc::new(Mutex::new(supervisor)),
            bridge: Arc::new(AsyncBridge::new()?),
            rpc,
            config: self.config,
            endpoint,
            rpc_port,
            home_dir,
        })
    }
}

impl Default for SandboxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-owned handle to one sandbox validator.
///
/// All operations are synchronous; internally they run on the bridge's
/// persistent execution context. Dropping the sandbox kills the process
/// group and removes an owned home directory. Sharing across helpers is
/// explicit (`Arc<Sandbox>`); there is no process-global instance.
pub struct Sandbox {
    supervisor: Arc<Mutex<Supervisor>>,
    bridge: Arc<AsyncBridge>,
    rpc: Arc<RpcClient>,
    config: SandboxConfig,
    endpoint: String,
    rpc_port: u16,
    home_dir: PathBuf,
}

impl Sandbox {
    /// Start configuring a sandbox.
    pub fn builder() -> SandboxBuilder {
        SandboxBuilder::new()
    }

    /// Build and start a sandbox with default configuration.
    pub fn start_default() -> HarnessResult<Self> {
        let sandbox = SandboxBuilder::new().build()?;
        sandbox.start()?;
        Ok(sandbox)
    }

    /// Start the validator; no-op when already healthy.
    pub fn start(&self) -> HarnessResult<()> {
        let supervisor = self.supervisor.clone();
        self.bridge
            .run(async move { supervisor.lock().await.start().await })?
    }

    /// Stop the validator and clean up its resources.
    pub fn stop(&self) -> HarnessResult<()> {
        let supervisor = self.supervisor.clone();
        self.bridge
            .run(async move { supervisor.lock().await.stop().await })?
    }

    /// Whether the validator is alive and answering status queries.
    pub fn is_running(&self) -> bool {
        let supervisor = self.supervisor.clone();
        self.bridge
            .run(async move { supervisor.lock().await.is_running().await })
            .unwrap_or(false)
    }

    /// Full reset to genesis: stop, wipe the data directory, restart.
    ///
    /// Fatal on failure: the controller should be considered unusable and
    /// the test aborted.
    pub fn reset_state(&self) -> HarnessResult<()> {
        let supervisor = self.supervisor.clone();
        self.bridge
            .run(async move { supervisor.lock().await.reset().await })?
    }

    /// Capture the full ledger state.
    pub fn dump_state(&self) -> HarnessResult<StateSnapshot> {
        let supervisor = self.supervisor.clone();
        let records = self
            .bridge
            .run(async move { supervisor.lock().await.dump_state().await })??;
        Ok(StateSnapshot::from_records(records))
    }

    /// Replace matching ledger records with the snapshot's records.
    ///
    /// Failure is recoverable: the sandbox stays usable and the caller may
    /// retry or fall back to [`reset_state`](Self::reset_state).
    pub fn restore_state(&self, snapshot: &StateSnapshot) -> HarnessResult<()> {
        let rpc = self.rpc.clone();
        let records = snapshot.records().to_vec();
        info!("restoring sandbox state ({} records)", records.len());
        let result = self
            .bridge
            .run(async move { rpc.patch_state(&records).await })?;
        match result {
            Ok(()) => {
                info!("sandbox state restored");
                Ok(())
            }
            Err(err) => {
                warn!("failed to restore sandbox state: {err}");
                Err(HarnessError::RestoreFailed(err))
            }
        }
    }

    /// JSON-RPC endpoint URL.
    pub fn rpc_endpoint(&self) -> &str {
        &self.endpoint
    }

    /// RPC port of this instance.
    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
    }

    /// Home directory of this instance.
    pub fn home_dir(&self) -> &std::path::Path {
        &self.home_dir
    }

    /// Master account id the validator key belongs to.
    pub fn master_account_id(&self) -> &str {
        &self.config.master_account_id
    }

    /// Read the validator key file from the home directory.
    pub fn validator_key(&self) -> HarnessResult<KeyFile> {
        let path = self.home_dir.join(crate::config::VALIDATOR_KEY_FILE);
        Ok(KeyFile::load(&path)?)
    }

    /// Execution context shared with clients connected to this sandbox.
    pub(crate) fn bridge(&self) -> Arc<AsyncBridge> {
        self.bridge.clone()
    }
}
