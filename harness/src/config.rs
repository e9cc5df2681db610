//! Harness configuration: defaults, constants and environment knobs.

use std::path::PathBuf;
use std::time::Duration;

/// Binary searched for on `PATH` when no explicit path is configured.
pub const DEFAULT_BINARY_NAME: &str = "near-sandbox";

/// Chain id passed to the one-time `init` subcommand.
pub const DEFAULT_CHAIN_ID: &str = "localnet";

/// Root account owning the validator key inside the sandbox.
pub const DEFAULT_MASTER_ACCOUNT_ID: &str = "test.near";

/// Key file written by `init` inside the home directory.
pub const VALIDATOR_KEY_FILE: &str = "validator_key.json";

/// File produced by the `view-state dump-state` subcommand.
pub const STATE_DUMP_FILE: &str = "output.json";

/// Ledger data subdirectory wiped by a full reset.
pub const DATA_DIR: &str = "data";

/// Wall-clock budget for the sandbox to become healthy after spawn.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between health probes while waiting for startup.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-attempt timeout of a single health probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Grace period between SIGTERM and SIGKILL on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Budget for the output drain tasks to flush after process exit.
pub const OUTPUT_FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// Funding attached to created accounts when the caller gives none.
pub const DEFAULT_ACCOUNT_BALANCE: u128 = 10_000_000_000_000_000_000_000_000;

/// Gas attached to function calls when the caller gives none.
pub const DEFAULT_CALL_GAS: u64 = 200_000_000_000_000;

/// Home directory override.
pub const ENV_SANDBOX_HOME: &str = "SANDBOX_HOME";
/// RPC port override.
pub const ENV_SANDBOX_RPC_PORT: &str = "SANDBOX_RPC_PORT";
/// Validator binary override.
pub const ENV_SANDBOX_BIN: &str = "SANDBOX_BIN";

/// Configuration consumed by the supervisor and the sandbox builder.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Home directory; `None` means a fresh harness-owned temp directory
    /// that is removed again on stop. A caller-supplied directory is never
    /// deleted.
    pub home_dir: Option<PathBuf>,
    /// RPC port; `None` means a freshly picked free port. Two supervisors
    /// must never share a (home, port) pair.
    pub rpc_port: Option<u16>,
    /// Validator binary; `None` falls back to `SANDBOX_BIN`, then `PATH`.
    pub binary_path: Option<PathBuf>,
    /// Chain id used by `init`.
    pub chain_id: String,
    /// Master account the validator key belongs to.
    pub master_account_id: String,
    /// Startup budget.
    pub startup_timeout: Duration,
    /// Startup probe interval.
    pub poll_interval: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            home_dir: None,
            rpc_port: None,
            binary_path: None,
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            master_account_id: DEFAULT_MASTER_ACCOUNT_ID.to_string(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SandboxConfig {
    /// Defaults overlaid with the `SANDBOX_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(home) = std::env::var(ENV_SANDBOX_HOME) {
            if !home.is_empty() {
                config.home_dir = Some(PathBuf::from(home));
            }
        }
        if let Ok(port) = std::env::var(ENV_SANDBOX_RPC_PORT) {
            if let Ok(port) = port.parse() {
                config.rpc_port = Some(port);
            }
        }
        if let Ok(bin) = std::env::var(ENV_SANDBOX_BIN) {
            if !bin.is_empty() {
                config.binary_path = Some(PathBuf::from(bin));
            }
        }
        config
    }
}
