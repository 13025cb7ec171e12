//! Worker isolation, resource limiting, and outcome reporting for the
//! Lancet sandboxed analysis engine.
//!
//! Handles per-attempt worker processes, the execution context the
//! snippet runs in, and the conversion of every possible worker fate
//! into a typed outcome for the orchestrator.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod context;
pub mod engine;
pub mod error;
pub mod handle;
pub mod process;
pub mod runner;
pub mod template;

pub use backend::{WireReport, WorkerBackend, WorkerProgram, WorkerRun};
pub use context::{ContextBuilder, ContextOptions, MAX_PROGRAM_BYTES};
pub use engine::{ExecutionRequest, SandboxEngine};
pub use error::ExecutorError;
pub use handle::WorkerHandle;
pub use process::{extract_marked_report, ProcessWorkerBackend};
pub use runner::{compute_hash, truncate_message, AttemptRunner, MAX_MESSAGE_LEN};
pub use template::{HarnessTemplate, TemplateError};
