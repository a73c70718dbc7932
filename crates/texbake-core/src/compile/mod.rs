//! Compilation pipeline for LaTeX documents.
//!
//! This module provides:
//! - Engine preflight (`--version` probe, fail fast at construction)
//! - The compile orchestrator (stage, pass 1, pass 2, read artifact)
//! - Engine log parsing (missing packages, `file:line:` diagnostics)
//!
//! # Architecture
//!
//! ```text
//! CompileRequest
//!     │
//!     ├── Workspace::create ──► stage source (+ sibling assets for path requests)
//!     │
//!     ├── pass 1 ──► failed, no PDF ──► MissingDependencies | Compilation
//!     │     │
//!     │     └── PDF written (any exit code) ──► pass 2
//!     │
//!     └── read <stem>.pdf ──► Artifact          (workspace dropped on every path)
//! ```

mod errors;
mod pipeline;
mod toolchain;
mod types;

pub use errors::{LogDiagnostic, missing_dependencies, parse_diagnostics};
pub use pipeline::Compiler;
pub use toolchain::{EngineIdentity, Toolchain};
pub use types::{Artifact, PDF_MAGIC, engine_args};
