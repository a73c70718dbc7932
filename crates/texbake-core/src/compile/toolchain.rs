//! Engine preflight.
//!
//! Verifies that the configured LaTeX engine exists and answers a
//! `--version` probe before any document is compiled.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::process::{Invocation, ProcessRunner, RunError};

/// A verified engine. Immutable once established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineIdentity {
    /// Engine name as configured.
    name: String,

    /// Resolved executable path.
    path: PathBuf,

    /// First line of the `--version` output.
    version: String,
}

impl EngineIdentity {
    /// Get the configured engine name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the resolved engine path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the engine version line.
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Preflight checker for the external engine.
pub struct Toolchain;

impl Toolchain {
    /// Verify that `engine` is installed and healthy.
    ///
    /// Runs `<engine> --version` with a bound of `timeout`. Safe to call
    /// repeatedly; the only side effect is the probe subprocess.
    pub async fn verify<R: ProcessRunner>(
        runner: &R,
        engine: &str,
        timeout: Duration,
    ) -> Result<EngineIdentity> {
        let path = runner.locate(engine).map_err(|e| {
            tracing::debug!("Engine lookup failed: {}", e);
            Error::EngineNotFound {
                engine: engine.to_string(),
            }
        })?;

        let probe_dir = std::env::temp_dir();
        let invocation = Invocation::new(&path, vec!["--version".to_string()], probe_dir, timeout);

        let output = runner.run(&invocation).await.map_err(|e| match e {
            RunError::NotFound(_) => Error::EngineNotFound {
                engine: engine.to_string(),
            },
            RunError::Timeout(timeout) => Error::EngineTimeout {
                engine: engine.to_string(),
                timeout,
            },
            RunError::Io(e) => Error::EngineUnhealthy {
                engine: engine.to_string(),
                detail: e.to_string(),
            },
        })?;

        if !output.success() {
            let detail = match output.stderr.trim() {
                "" => format!("--version exited with {:?}", output.exit_code),
                stderr => stderr.to_string(),
            };
            return Err(Error::EngineUnhealthy {
                engine: engine.to_string(),
                detail,
            });
        }

        let version = output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();

        tracing::info!("Using LaTeX engine {} ({})", path.display(), version);

        Ok(EngineIdentity {
            name: engine.to_string(),
            path,
            version,
        })
    }
}
