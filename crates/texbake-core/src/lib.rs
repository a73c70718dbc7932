//! Sandboxed LaTeX-to-PDF compilation.
//!
//! This crate provides:
//! - Engine preflight for `pdflatex`, `xelatex`, `lualatex` or any compatible binary
//! - Per-request isolated workspaces that never outlive the call
//! - Two-pass compilation with warning tolerance and bounded timeouts
//! - Structured failures (missing packages, engine diagnostics) for the caller
//!
//! ```no_run
//! # async fn demo() -> texbake_core::Result<()> {
//! use texbake_core::{CompileRequest, Compiler, CompilerConfig};
//!
//! let compiler = Compiler::new(CompilerConfig::default()).await?;
//! let request = CompileRequest::from_bytes("hello.tex", r"\documentclass{article}\begin{document}Hi\end{document}")?;
//! let artifact = compiler.compile(request).await?;
//! assert!(artifact.has_pdf_header());
//! # Ok(())
//! # }
//! ```

pub mod compile;
pub mod config;
pub mod error;
pub mod process;
pub mod request;
pub mod workspace;

pub use compile::{Artifact, Compiler, EngineIdentity, LogDiagnostic, Toolchain};
pub use config::CompilerConfig;
pub use error::{Error, ErrorKind, FailureReport, Result};
pub use process::{EngineOutput, Invocation, ProcessRunner, RunError, SystemRunner};
pub use request::{CompileRequest, SourceInput};
pub use workspace::Workspace;
