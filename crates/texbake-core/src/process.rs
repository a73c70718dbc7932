//! Engine subprocess execution.
//!
//! The orchestrator never spawns processes directly. It goes through a
//! [`ProcessRunner`], so the compile logic can be driven by a scripted fake
//! in tests and by [`SystemRunner`] in production.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;

/// One execution of an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute (resolved path or bare name).
    pub program: PathBuf,

    /// Arguments, in order.
    pub args: Vec<String>,

    /// Working directory for the child process.
    pub working_dir: PathBuf,

    /// Hard wall-clock bound.
    pub timeout: Duration,
}

impl Invocation {
    /// Create an invocation.
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            timeout,
        }
    }
}

/// Captured result of a finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,

    /// Captured standard output (lossy UTF-8).
    pub stdout: String,

    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl EngineOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, for diagnostics.
    pub fn combined_log(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Failure to obtain an [`EngineOutput`].
#[derive(Debug, Error)]
pub enum RunError {
    /// The program does not exist or is not executable.
    #[error("program not found: {0}")]
    NotFound(String),

    /// The process was killed after exceeding its bound.
    #[error("process timed out after {0:?}")]
    Timeout(Duration),

    /// Spawning or waiting failed for another reason.
    #[error("process IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Narrow interface to the operating system's process facilities.
pub trait ProcessRunner: Send + Sync {
    /// Resolve a program name to an executable path.
    fn locate(&self, program: &str) -> Result<PathBuf, RunError>;

    /// Run the invocation to completion, or until its timeout fires.
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<EngineOutput, RunError>> + Send;
}

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// Stdin is closed so an engine can never block waiting for terminal input.
/// On Unix each child is placed in its own process group, and the whole group
/// is killed on timeout. Dropping the returned future kills the child.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a system runner.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn locate(&self, program: &str) -> Result<PathBuf, RunError> {
        which::which(program).map_err(|_| RunError::NotFound(program.to_string()))
    }

    async fn run(&self, invocation: &Invocation) -> Result<EngineOutput, RunError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| spawn_error(&invocation.program, e))?;
        let pid = child.id();
        let start = Instant::now();

        match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                tracing::debug!(
                    "{} exited with {:?} after {}ms",
                    invocation.program.display(),
                    output.status.code(),
                    start.elapsed().as_millis()
                );
                Ok(EngineOutput {
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Ok(Err(e)) => Err(RunError::Io(e)),
            Err(_elapsed) => {
                // The child itself was killed when the wait future was dropped.
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                tracing::warn!(
                    "{} killed after exceeding {:?}",
                    invocation.program.display(),
                    invocation.timeout
                );
                Err(RunError::Timeout(invocation.timeout))
            }
        }
    }
}

fn spawn_error(program: &Path, e: std::io::Error) -> RunError {
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            RunError::NotFound(program.display().to_string())
        }
        _ => RunError::Io(e),
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // The child was spawned with process_group(0), so its pid is the pgid.
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
