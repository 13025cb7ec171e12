//! Error types for the executor crate.
//!
//! These are internal plumbing errors: the attempt runner converts every
//! one of them into an `Outcome` value before the orchestrator boundary.

use std::path::PathBuf;

use crate::template::TemplateError;

/// Errors that can occur while preparing or supervising a worker.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// Interpreter binary not found at the configured path or in `PATH`.
    #[error("interpreter not found at {path}")]
    InterpreterNotFound { path: PathBuf },

    /// Worker process failed to spawn.
    #[error("worker spawn failed: {0}")]
    SpawnFailed(String),

    /// The assembled worker program exceeds the size bound.
    #[error("worker program too large: {bytes} bytes")]
    ProgramTooLarge { bytes: usize },

    /// Harness template rendering failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The worker exited cleanly but its report could not be parsed.
    #[error("malformed worker report: {0}")]
    MalformedReport(String),

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
