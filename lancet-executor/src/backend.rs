//! Worker backend abstraction trait.
//!
//! Allows swapping the process-isolated worker for alternative isolation
//! substrates — and, in tests, for scripted mock backends — without
//! changing the attempt orchestration logic. Deterministic fixtures live
//! exclusively in such mocks: production code never recognizes special
//! inputs.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lancet_core::ExecLimits;

use crate::ExecutorError;

/// The fully assembled program a worker executes: harness plus embedded
/// snippet, dataset copy, and capability gate decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct WorkerProgram {
    source: String,
}

impl WorkerProgram {
    /// Wraps an assembled program source.
    #[must_use]
    pub fn new(source: String) -> Self {
        Self { source }
    }

    /// Returns the program source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the program length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Returns `true` if the program is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// The JSON document a worker prints between its output markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[non_exhaustive]
pub enum WireReport {
    /// The snippet ran to completion; both sentinel values follow.
    #[serde(rename = "ok")]
    Completed {
        /// Final value of the `result` sentinel.
        #[serde(default)]
        result: Value,
        /// Final value of the `visualization` sentinel.
        #[serde(default)]
        visualization: Value,
    },
    /// The snippet reached a denied or stubbed capability.
    Blocked {
        /// The capability name as requested.
        capability: String,
    },
    /// The snippet raised an uncaught error.
    Failed {
        /// Machine-readable category (e.g. `"division_by_zero"`).
        category: String,
        /// Error detail, already bounded by the harness.
        message: String,
    },
    /// The snippet breached the in-worker memory ceiling.
    MemoryExceeded,
    /// The sentinel values could not be serialized for transport.
    Unserializable {
        /// What defeated serialization.
        reason: String,
    },
}

/// What happened to one worker, as observed by its backend.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum WorkerRun {
    /// The worker completed and produced a parseable report.
    Finished {
        /// The report read between the output markers.
        report: WireReport,
        /// Wall-clock time from spawn to exit.
        elapsed: Duration,
    },
    /// The worker exceeded the wall-clock ceiling and was force-killed.
    /// The backend guarantees the process is fully reclaimed before
    /// returning this value.
    TimedOut {
        /// Wall-clock time at the moment of the kill.
        elapsed: Duration,
    },
    /// The worker exited without producing a parseable report.
    Crashed {
        /// Process exit code, when one exists (none after a signal).
        exit_code: Option<i32>,
        /// Truncated diagnostic excerpt (stderr or parse failure).
        detail: String,
        /// Wall-clock time from spawn to exit.
        elapsed: Duration,
    },
}

/// Isolation substrate that runs one worker per call.
///
/// Implementations must be `Send + Sync` to allow use across async
/// tasks. Workers are never reused across attempts.
///
/// # Cancel Safety
/// `run` must be cancel safe: dropping the future at any await point
/// must still reclaim the worker (the process backend relies on
/// `kill_on_drop` for this).
#[async_trait]
pub trait WorkerBackend: Send + Sync {
    /// Run one worker to completion, timeout, or crash.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InterpreterNotFound`] or
    /// [`ExecutorError::SpawnFailed`] when no worker could be started at
    /// all. Once a worker is running, every fate is reported through
    /// [`WorkerRun`], not as an error.
    async fn run(
        &self,
        program: &WorkerProgram,
        limits: &ExecLimits,
    ) -> Result<WorkerRun, ExecutorError>;

    /// Check that the backend can start workers in this environment.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InterpreterNotFound`] or
    /// [`ExecutorError::SpawnFailed`] if the environment is not ready.
    async fn health_check(&self) -> Result<(), ExecutorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_report_parses_ok_status() {
        let json = r#"{"status":"ok","result":42,"visualization":null}"#;
        let report: WireReport = match serde_json::from_str(json) {
            Ok(r) => r,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert_eq!(
            report,
            WireReport::Completed {
                result: serde_json::json!(42),
                visualization: Value::Null,
            }
        );
    }

    #[test]
    fn wire_report_parses_blocked_and_memory_statuses() {
        let blocked: WireReport =
            match serde_json::from_str(r#"{"status":"blocked","capability":"socket"}"#) {
                Ok(r) => r,
                Err(e) => panic!("parse failed: {e}"),
            };
        assert_eq!(blocked, WireReport::Blocked { capability: "socket".to_owned() });

        let memory: WireReport = match serde_json::from_str(r#"{"status":"memory_exceeded"}"#) {
            Ok(r) => r,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert_eq!(memory, WireReport::MemoryExceeded);
    }

    #[test]
    fn wire_report_missing_sentinels_default_to_null() {
        let report: WireReport = match serde_json::from_str(r#"{"status":"ok"}"#) {
            Ok(r) => r,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert_eq!(
            report,
            WireReport::Completed { result: Value::Null, visualization: Value::Null }
        );
    }
}
