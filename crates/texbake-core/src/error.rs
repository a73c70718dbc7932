//! Error types for texbake-core.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::compile::LogDiagnostic;

/// Result type for texbake-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while verifying the engine or compiling a document.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine binary could not be found on the execution path.
    #[error("LaTeX engine '{engine}' not found")]
    EngineNotFound { engine: String },

    /// The engine binary exists but its health probe exited non-zero.
    #[error("LaTeX engine '{engine}' is not working properly: {detail}")]
    EngineUnhealthy { engine: String, detail: String },

    /// The engine health probe did not finish in time.
    #[error("LaTeX engine '{engine}' timed out after {timeout:?} during validation")]
    EngineTimeout { engine: String, timeout: Duration },

    /// The caller supplied an unusable request (bad extension, bad file name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The source document does not exist.
    #[error("source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The engine reported packages or classes it could not find.
    #[error("compilation failed due to missing packages: {}", names.join(", "))]
    MissingDependencies { names: Vec<String>, log: String },

    /// The engine failed without producing an artifact.
    #[error("compilation failed")]
    Compilation {
        log: String,
        diagnostics: Vec<LogDiagnostic>,
    },

    /// An engine pass exceeded its wall-clock bound.
    #[error("compilation timed out after {timeout:?}")]
    CompilationTimeout { timeout: Duration },

    /// The engine finished but the expected output file is absent.
    #[error("PDF file '{file_name}' was not generated after compilation")]
    ArtifactMissing { file_name: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable classification of [`Error`] for callers that map errors onto a
/// transport (HTTP status codes, job states, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EngineNotFound,
    EngineUnhealthy,
    EngineTimeout,
    InvalidInput,
    SourceNotFound,
    MissingDependencies,
    CompilationError,
    CompilationTimeout,
    ArtifactMissing,
    Io,
}

/// Serializable failure record handed to the output sink.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<LogDiagnostic>,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EngineNotFound { .. } => ErrorKind::EngineNotFound,
            Error::EngineUnhealthy { .. } => ErrorKind::EngineUnhealthy,
            Error::EngineTimeout { .. } => ErrorKind::EngineTimeout,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::SourceNotFound(_) => ErrorKind::SourceNotFound,
            Error::MissingDependencies { .. } => ErrorKind::MissingDependencies,
            Error::Compilation { .. } => ErrorKind::CompilationError,
            Error::CompilationTimeout { .. } => ErrorKind::CompilationTimeout,
            Error::ArtifactMissing { .. } => ErrorKind::ArtifactMissing,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this error describes the host environment rather than the
    /// submitted document. Environment errors are fatal at startup.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            Error::EngineNotFound { .. } | Error::EngineUnhealthy { .. } | Error::EngineTimeout { .. }
        )
    }

    /// The engine log captured for this failure, if any.
    pub fn log(&self) -> Option<&str> {
        match self {
            Error::MissingDependencies { log, .. } | Error::Compilation { log, .. } => Some(log),
            _ => None,
        }
    }

    /// Names of the unresolved packages, empty unless this is
    /// [`Error::MissingDependencies`].
    pub fn missing_dependencies(&self) -> &[String] {
        match self {
            Error::MissingDependencies { names, .. } => names,
            _ => &[],
        }
    }

    /// A recovery hint for the operator or end user.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::EngineNotFound { .. } => Some(
                "install a TeX distribution (TeX Live, MiKTeX or MacTeX) and make sure the engine is on PATH"
                    .to_string(),
            ),
            Error::EngineTimeout { .. } | Error::CompilationTimeout { .. } => {
                Some("retry with a longer timeout".to_string())
            }
            Error::MissingDependencies { names, .. } => {
                Some(format!("try installing them, e.g. 'tlmgr install {}'", names.join(" ")))
            }
            _ => None,
        }
    }

    /// Build the structured failure record for this error.
    pub fn report(&self) -> FailureReport {
        let diagnostics = match self {
            Error::Compilation { diagnostics, .. } => diagnostics.clone(),
            _ => Vec::new(),
        };

        FailureReport {
            kind: self.kind(),
            message: self.to_string(),
            hint: self.hint(),
            log: self.log().unwrap_or_default().to_string(),
            missing_dependencies: self.missing_dependencies().to_vec(),
            diagnostics,
        }
    }
}

impl FailureReport {
    /// Format the report as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({
                "kind": self.kind,
                "message": self.message,
            })
        })
    }
}
