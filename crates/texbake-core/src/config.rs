//! Compiler configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Engine used when none is configured.
pub const DEFAULT_ENGINE: &str = "pdflatex";

/// Per-pass compilation bound, in milliseconds.
pub const DEFAULT_COMPILE_TIMEOUT_MS: u64 = 60_000;

/// Health probe bound, in milliseconds.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;

/// Configuration for the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Engine name (looked up on PATH) or path to the engine binary.
    pub engine: String,

    /// Directory under which per-request workspaces are created.
    pub workspace_root: PathBuf,

    /// Wall-clock bound for each compilation pass, in milliseconds.
    pub compile_timeout_ms: u64,

    /// Wall-clock bound for the `--version` health probe, in milliseconds.
    pub probe_timeout_ms: u64,

    /// Additional engine flags, placed before the source file name.
    pub extra_args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            workspace_root: std::env::temp_dir(),
            compile_timeout_ms: DEFAULT_COMPILE_TIMEOUT_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            extra_args: Vec::new(),
        }
    }
}

impl CompilerConfig {
    /// Build a config from the defaults overlaid with `TEXBAKE_*` environment
    /// variables.
    ///
    /// Recognized variables: `TEXBAKE_ENGINE`, `TEXBAKE_WORKSPACE_ROOT`,
    /// `TEXBAKE_COMPILE_TIMEOUT` and `TEXBAKE_PROBE_TIMEOUT`. Timeouts are
    /// given in whole seconds.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(engine) = lookup("TEXBAKE_ENGINE").filter(|e| !e.trim().is_empty()) {
            config.engine = engine.trim().to_string();
        }
        if let Some(root) = lookup("TEXBAKE_WORKSPACE_ROOT").filter(|r| !r.is_empty()) {
            config.workspace_root = PathBuf::from(root);
        }
        if let Some(secs) = lookup("TEXBAKE_COMPILE_TIMEOUT") {
            config.compile_timeout_ms = parse_timeout("TEXBAKE_COMPILE_TIMEOUT", &secs)?;
        }
        if let Some(secs) = lookup("TEXBAKE_PROBE_TIMEOUT") {
            config.probe_timeout_ms = parse_timeout("TEXBAKE_PROBE_TIMEOUT", &secs)?;
        }

        Ok(config)
    }

    /// Use a different engine.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Create workspaces under `root` instead of the system temp directory.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Set the per-pass compilation bound.
    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout_ms = millis_rounded_up(timeout);
        self
    }

    /// Set the health probe bound.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = millis_rounded_up(timeout);
        self
    }

    /// Get the per-pass compilation bound.
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    /// Get the health probe bound.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn parse_timeout(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .and_then(|secs| secs.checked_mul(1000))
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "{key} must be a positive number of seconds, got '{value}'"
            ))
        })
}

/// A non-zero duration never becomes a zero bound.
fn millis_rounded_up(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}
