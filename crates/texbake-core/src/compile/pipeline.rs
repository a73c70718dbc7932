//! Compilation orchestrator.
//!
//! Stages a request into a fresh workspace, runs the engine at most twice and
//! returns the produced PDF or a typed failure.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::CompilerConfig;
use crate::error::{Error, Result};
use crate::process::{EngineOutput, Invocation, ProcessRunner, RunError, SystemRunner};
use crate::request::{CompileRequest, SourceInput, artifact_name_for};
use crate::workspace::Workspace;

use super::errors::{missing_dependencies, parse_diagnostics};
use super::toolchain::{EngineIdentity, Toolchain};
use super::types::{Artifact, engine_args};

/// Compiles LaTeX documents to PDF with an external engine.
///
/// Construction runs the engine preflight, so a `Compiler` always holds a
/// verified engine. Cloning is cheap and clones share the engine identity;
/// concurrent `compile` calls never share a workspace.
pub struct Compiler<R = SystemRunner> {
    /// Compiler configuration
    config: CompilerConfig,

    /// Engine verified at construction
    engine: Arc<EngineIdentity>,

    /// Process runner used for every engine pass
    runner: Arc<R>,
}

impl<R> Clone for Compiler<R> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            engine: Arc::clone(&self.engine),
            runner: Arc::clone(&self.runner),
        }
    }
}

impl Compiler<SystemRunner> {
    /// Create a compiler that runs the engine as a real subprocess.
    ///
    /// # Errors
    /// Returns `EngineNotFound`, `EngineUnhealthy` or `EngineTimeout` when the
    /// configured engine fails its preflight.
    pub async fn new(config: CompilerConfig) -> Result<Self> {
        Self::with_runner(config, SystemRunner::new()).await
    }
}

impl<R: ProcessRunner> Compiler<R> {
    /// Create a compiler on top of a custom process runner.
    pub async fn with_runner(config: CompilerConfig, runner: R) -> Result<Self> {
        let engine = Toolchain::verify(&runner, &config.engine, config.probe_timeout()).await?;

        Ok(Self {
            config,
            engine: Arc::new(engine),
            runner: Arc::new(runner),
        })
    }

    /// Get the verified engine.
    pub fn engine(&self) -> &EngineIdentity {
        &self.engine
    }

    /// Get the compiler configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a document on disk.
    pub async fn compile_path(&self, path: impl AsRef<Path>) -> Result<Artifact> {
        let request = CompileRequest::from_path(path.as_ref())?;
        self.compile(request).await
    }

    /// Compile uploaded content.
    pub async fn compile_bytes(&self, file_name: &str, content: Vec<u8>) -> Result<Artifact> {
        let request = CompileRequest::from_bytes(file_name, content)?;
        self.compile(request).await
    }

    /// Compile a request.
    ///
    /// The workspace is removed before this returns, on success, on failure,
    /// and when the returned future is dropped early.
    pub async fn compile(&self, request: CompileRequest) -> Result<Artifact> {
        let start = Instant::now();
        let (file_name, input) = request.into_input();
        let artifact_name = artifact_name_for(&file_name);

        if let SourceInput::Path(path) = &input {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => {}
                _ => return Err(Error::SourceNotFound(path.clone())),
            }
        }

        let workspace = Workspace::create(&self.config.workspace_root).await?;

        match input {
            SourceInput::Path(path) => {
                workspace.stage_file(&path, &file_name).await?;

                let source_dir = match path.parent() {
                    Some(dir) if !dir.as_os_str().is_empty() => dir,
                    _ => Path::new("."),
                };
                // A stale PDF next to the source must not pass for fresh output.
                let staged = workspace
                    .stage_auxiliary(source_dir, &[artifact_name.as_str()])
                    .await?;
                if !staged.is_empty() {
                    tracing::debug!("Staged {} auxiliary files: {}", staged.len(), staged.join(", "));
                }
            }
            SourceInput::Upload(mut reader) => {
                workspace.stage_reader(&mut reader, &file_name).await?;
            }
        }

        let artifact = self.run_passes(&workspace, &file_name, &artifact_name).await?;

        tracing::info!(
            "Compiled {} to {} ({} bytes) in {}ms",
            file_name,
            artifact.file_name,
            artifact.len(),
            start.elapsed().as_millis()
        );
        Ok(artifact)
    }

    /// Run the engine over the staged source.
    ///
    /// A second pass only runs when the first produced a PDF. There is no
    /// bibliography or index step, so documents needing more than two passes
    /// keep stale references.
    async fn run_passes(
        &self,
        workspace: &Workspace,
        file_name: &str,
        artifact_name: &str,
    ) -> Result<Artifact> {
        let invocation = Invocation::new(
            self.engine.path(),
            engine_args(file_name, &self.config.extra_args),
            workspace.path(),
            self.config.compile_timeout(),
        );
        let artifact_path = workspace.file(artifact_name);

        let first = self.run_pass(&invocation, 1).await?;
        let produced = tokio::fs::try_exists(&artifact_path).await?;

        if !first.success() && !produced {
            return Err(failure_from_log(first.combined_log()));
        }

        if produced {
            if !first.success() {
                tracing::debug!(
                    "Pass 1 exited with {:?} but wrote {}, treating as warnings",
                    first.exit_code,
                    artifact_name
                );
            }
            // Only the effect on the artifact matters here, not the exit code.
            self.run_pass(&invocation, 2).await?;
        }

        match tokio::fs::read(&artifact_path).await {
            Ok(bytes) => Ok(Artifact {
                file_name: artifact_name.to_string(),
                bytes,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Engine reported no error but {} is missing", artifact_name);
                Err(Error::ArtifactMissing {
                    file_name: artifact_name.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn run_pass(&self, invocation: &Invocation, pass: u8) -> Result<EngineOutput> {
        let start = Instant::now();

        let output = self.runner.run(invocation).await.map_err(|e| match e {
            RunError::Timeout(timeout) => Error::CompilationTimeout { timeout },
            RunError::NotFound(_) => Error::EngineNotFound {
                engine: self.engine.name().to_string(),
            },
            RunError::Io(e) => Error::Io(e),
        })?;

        tracing::debug!(
            "Pass {} of {} exited with {:?} in {}ms",
            pass,
            self.engine.name(),
            output.exit_code,
            start.elapsed().as_millis()
        );
        Ok(output)
    }
}

/// Classify a failing engine log.
fn failure_from_log(log: String) -> Error {
    let names = missing_dependencies(&log);
    if !names.is_empty() {
        tracing::debug!("Compilation failed, missing packages: {}", names.join(", "));
        return Error::MissingDependencies { names, log };
    }

    let diagnostics = parse_diagnostics(&log);
    tracing::debug!("Compilation failed with {} diagnostics", diagnostics.len());
    Error::Compilation { log, diagnostics }
}
