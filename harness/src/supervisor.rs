//! Supervision of the sandbox validator process.
//!
//! The supervisor owns exactly one child process and its home directory:
//! spawn (with one-time `init`), health polling, graceful-then-forced
//! shutdown of the whole process group, and one-shot subcommands such as the
//! state dump. It knows nothing about accounts, transactions or decoding.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use sandbox_common::rpc::RpcClient;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::binary;
use crate::config::{
    SandboxConfig, DATA_DIR, OUTPUT_FLUSH_TIMEOUT, PROBE_TIMEOUT, SHUTDOWN_GRACE, STATE_DUMP_FILE,
    VALIDATOR_KEY_FILE,
};
use crate::error::{HarnessError, HarnessResult};

/// Home directory of a sandbox instance.
///
/// An owned home is created by the supervisor and removed again on stop; a
/// borrowed one belongs to the caller and is never deleted.
enum HomeDir {
    Owned(TempDir),
    Borrowed(PathBuf),
}

impl HomeDir {
    fn path(&self) -> &Path {
        match self {
            HomeDir::Owned(dir) => dir.path(),
            HomeDir::Borrowed(path) => path,
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self, HomeDir::Owned(_))
    }
}

/// Supervisor for one sandbox validator process.
///
/// At most one instance may bind a given (home directory, RPC port) pair;
/// the default configuration guarantees this with a fresh temp directory and
/// a freshly picked free port.
pub struct Supervisor {
    config: SandboxConfig,
    home: HomeDir,
    rpc_port: u16,
    binary: Option<PathBuf>,
    child: Option<Child>,
    probe: RpcClient,
    stdout_buf: Arc<Mutex<String>>,
    stderr_buf: Arc<Mutex<String>>,
    drain_handles: Vec<JoinHandle<()>>,
}

impl Supervisor {
    /// Build a supervisor from `config` without starting anything.
    pub fn new(config: SandboxConfig) -> HarnessResult<Self> {
        let home = match &config.home_dir {
            Some(path) => HomeDir::Borrowed(path.clone()),
            None => HomeDir::Owned(
                tempfile::Builder::new()
                    .prefix("sandbox_home_")
                    .tempdir()?,
            ),
        };
        let rpc_port = match config.rpc_port {
            Some(port) => port,
            None => portpicker::pick_unused_port().ok_or(HarnessError::NoFreePort)?,
        };
        let probe = RpcClient::with_timeout(format!("http://localhost:{rpc_port}"), PROBE_TIMEOUT)?;

        Ok(Self {
            config,
            home,
            rpc_port,
            binary: None,
            child: None,
            probe,
            stdout_buf: Arc::new(Mutex::new(String::new())),
            stderr_buf: Arc::new(Mutex::new(String::new())),
            drain_handles: Vec::new(),
        })
    }

    /// Home directory path.
    pub fn home_dir(&self) -> &Path {
        self.home.path()
    }

    /// RPC port the validator is (or will be) listening on.
    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
    }

    /// HTTP endpoint of the validator's JSON-RPC server.
    pub fn rpc_endpoint(&self) -> String {
        format!("http://localhost:{}", self.rpc_port)
    }

    /// Path of the validator key file inside the home directory.
    pub fn validator_key_path(&self) -> PathBuf {
        self.home.path().join(VALIDATOR_KEY_FILE)
    }

    /// Captured stderr of the current or last child process.
    pub fn stderr_output(&self) -> String {
        self.stderr_buf.lock().clone()
    }

    /// Start the validator if it is not already running.
    ///
    /// Startup failures are fatal to the call and leave no process behind.
    pub async fn start(&mut self) -> HarnessResult<()> {
        if self.is_running().await {
            debug!("sandbox already running on port {}", self.rpc_port);
            return Ok(());
        }

        let binary = self.binary()?;
        std::fs::create_dir_all(self.home.path())?;

        if !self.validator_key_path().exists() {
            info!("initializing sandbox home at {}", self.home.path().display());
            let chain_id = self.config.chain_id.clone();
            self.run_command(&["init", "--chain-id", &chain_id])
                .await
                .map_err(|err| match err {
                    HarnessError::CommandFailed { stderr, .. } => {
                        HarnessError::InitFailed { stderr }
                    }
                    other => other,
                })?;
        }

        let network_port = portpicker::pick_unused_port().ok_or(HarnessError::NoFreePort)?;
        info!("starting sandbox on port {}", self.rpc_port);

        let mut cmd = std::process::Command::new(&binary);
        cmd.arg("--home")
            .arg(self.home.path())
            .arg("run")
            .arg("--rpc-addr")
            .arg(format!("0.0.0.0:{}", self.rpc_port))
            .arg("--network-addr")
            .arg(format!("0.0.0.0:{network_port}"));
        {
            // Own process group, so shutdown signals reach forked children
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut cmd = Command::from(cmd);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        self.stdout_buf.lock().clear();
        self.stderr_buf.lock().clear();
        self.drain_handles.clear();
        if let Some(stdout) = child.stdout.take() {
            self.drain_handles
                .push(drain_into(stdout, self.stdout_buf.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            self.drain_handles
                .push(drain_into(stderr, self.stderr_buf.clone()));
        }
        self.child = Some(child);

        self.wait_for_start(self.config.startup_timeout, self.config.poll_interval)
            .await
    }

    /// Whether the process is alive and answering status queries.
    ///
    /// Probe failures mean `false`, never an error; this is polled in a tight
    /// loop during startup and must stay cheap and side-effect-free.
    pub async fn is_running(&mut self) -> bool {
        match &mut self.child {
            None => false,
            Some(child) => match child.try_wait() {
                Ok(Some(_)) => {
                    self.child = None;
                    false
                }
                Err(_) => false,
                Ok(None) => self.probe.status().await.is_ok(),
            },
        }
    }

    /// Stop the validator and clean up.
    ///
    /// The whole process group receives SIGTERM, then SIGKILL after the
    /// grace period. An owned home directory is removed; a missing one is
    /// tolerated.
    pub async fn stop(&mut self) -> HarnessResult<()> {
        if let Some(mut child) = self.child.take() {
            info!("stopping sandbox...");
            signal_group(&child, Signal::SIGTERM);
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(_) => debug!("sandbox stopped"),
                Err(_) => {
                    warn!("sandbox did not stop gracefully, forcing shutdown...");
                    signal_group(&child, Signal::SIGKILL);
                    let _ = child.kill().await;
                }
            }
        }
        for handle in self.drain_handles.drain(..) {
            let _ = tokio::time::timeout(OUTPUT_FLUSH_TIMEOUT, handle).await;
        }

        if self.home.is_owned() {
            match std::fs::remove_dir_all(self.home.path()) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!("failed to remove sandbox home: {err}"),
            }
        }
        Ok(())
    }

    /// Reset the chain to genesis: stop, wipe the data directory, restart.
    ///
    /// Only the `data` subdirectory is deleted, so a borrowed home keeps its
    /// validator keys. Expensive; prefer snapshot/restore for per-test
    /// isolation.
    pub async fn reset(&mut self) -> HarnessResult<()> {
        info!("resetting sandbox to genesis state...");
        self.stop().await?;

        let data_dir = self.home.path().join(DATA_DIR);
        match std::fs::remove_dir_all(&data_dir) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        self.start().await
    }

    /// Export the full ledger state as an ordered record list.
    ///
    /// Runs the `view-state dump-state` subcommand, then reads the produced
    /// dump file back. Deterministic for identical prior state.
    pub async fn dump_state(&mut self) -> HarnessResult<Vec<Value>> {
        info!("dumping sandbox state...");
        self.run_command(&["view-state", "dump-state"]).await?;

        let dump_path = self.home.path().join(STATE_DUMP_FILE);
        let contents = std::fs::read_to_string(&dump_path)?;
        let parsed: Value = serde_json::from_str(&contents)?;
        let records = parsed
            .get("records")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                HarnessError::Snapshot(format!(
                    "dump file {} has no records array",
                    dump_path.display()
                ))
            })?
            .clone();
        debug!("dumped {} state records", records.len());
        Ok(records)
    }

    /// Run a one-shot sandbox subcommand against the home directory.
    pub async fn run_command(&mut self, args: &[&str]) -> HarnessResult<std::process::Output> {
        let binary = self.binary()?;
        if log::log_enabled!(log::Level::Debug) {
            debug!("running sandbox command: {}", args.join(" "));
        }
        let output = Command::new(&binary)
            .arg("--home")
            .arg(self.home.path())
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            return Err(HarnessError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output)
    }

    /// Poll until the validator answers, fail fast if it dies.
    async fn wait_for_start(&mut self, timeout: Duration, interval: Duration) -> HarnessResult<()> {
        debug!("waiting for sandbox to start (timeout: {timeout:?})");
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // A dead process can never become healthy; fail with its stderr
            // instead of waiting out the budget.
            let exited = match &mut self.child {
                None => true,
                Some(child) => matches!(child.try_wait(), Ok(Some(_))),
            };
            if exited {
                self.child = None;
                let stderr = self.flush_output().await;
                return Err(HarnessError::ProcessDied { stderr });
            }

            if self.probe.status().await.is_ok() {
                info!("sandbox is healthy on port {}", self.rpc_port);
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        let stderr = self.flush_output().await;
        let _ = self.stop().await;
        Err(HarnessError::StartupTimeout { timeout, stderr })
    }

    /// Let the drain tasks finish, then read what stderr holds.
    async fn flush_output(&mut self) -> String {
        for handle in self.drain_handles.drain(..) {
            let _ = tokio::time::timeout(OUTPUT_FLUSH_TIMEOUT, handle).await;
        }
        self.stderr_buf.lock().clone()
    }

    fn binary(&mut self) -> HarnessResult<PathBuf> {
        if let Some(path) = &self.binary {
            return Ok(path.clone());
        }
        let path = binary::resolve(&self.config)?;
        self.binary = Some(path.clone());
        Ok(path)
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Best-effort cleanup on the sync path; `kill_on_drop` reaps the
        // direct child, the group signal reaches anything it forked.
        if let Some(child) = &self.child {
            signal_group(child, Signal::SIGKILL);
        }
    }
}

fn signal_group(child: &Child, signal: Signal) {
    if let Some(pid) = child.id() {
        if let Err(err) = killpg(Pid::from_raw(pid as i32), signal) {
            debug!("failed to signal sandbox process group: {err}");
        }
    }
}

fn drain_into(
    stream: impl tokio::io::AsyncRead + Unpin + Send + 'static,
    buffer: Arc<Mutex<String>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut buffer = buffer.lock();
            buffer.push_str(&line);
            buffer.push('\n');
        }
    })
}
