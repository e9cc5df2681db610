//! Validator binary resolution.
//!
//! Download and installation are someone else's job; this module only finds
//! an existing binary: explicit configuration first, then the `SANDBOX_BIN`
//! environment variable, then a `PATH` search.

use std::path::PathBuf;

use log::debug;

use crate::config::{SandboxConfig, DEFAULT_BINARY_NAME, ENV_SANDBOX_BIN};
use crate::error::{HarnessError, HarnessResult};

/// Resolve the validator binary for `config`.
pub fn resolve(config: &SandboxConfig) -> HarnessResult<PathBuf> {
    let mut tried = Vec::new();

    if let Some(path) = &config.binary_path {
        if is_executable(path) {
            debug!("using configured sandbox binary at {}", path.display());
            return Ok(path.clone());
        }
        tried.push(format!("configured path {}", path.display()));
    }

    if let Ok(value) = std::env::var(ENV_SANDBOX_BIN) {
        if !value.is_empty() {
            let path = PathBuf::from(&value);
            if is_executable(&path) {
                debug!("using sandbox binary from {ENV_SANDBOX_BIN} ({value})");
                return Ok(path);
            }
            tried.push(format!("{ENV_SANDBOX_BIN}={value}"));
        }
    }

    if let Some(path) = search_path(DEFAULT_BINARY_NAME) {
        debug!("found sandbox binary on PATH at {}", path.display());
        return Ok(path);
    }
    tried.push(format!("`{DEFAULT_BINARY_NAME}` on PATH"));

    Err(HarnessError::BinaryNotFound {
        tried: tried.join(", "),
    })
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_binary(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_binary(dir.path(), "my-validator");

        let config = SandboxConfig {
            binary_path: Some(bin.clone()),
            ..SandboxConfig::default()
        };
        assert_eq!(resolve(&config).unwrap(), bin);
    }

    #[test]
    fn missing_binary_reports_what_was_tried() {
        let config = SandboxConfig {
            binary_path: Some(PathBuf::from("/nonexistent/validator")),
            ..SandboxConfig::default()
        };
        // PATH may or may not contain a real binary on the machine running
        // the tests; only assert on the error shape when resolution fails.
        if let Err(err) = resolve(&config) {
            let message = err.to_string();
            assert!(message.contains("/nonexistent/validator"));
            assert!(message.contains(DEFAULT_BINARY_NAME));
        }
    }

    #[test]
    fn non_executable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-executable");
        std::fs::write(&path, "data").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!is_executable(&path));
    }
}
