//! Attempt runner — resource limiting and outcome reporting for one
//! execution attempt.
//!
//! The runner is the boundary the orchestrator sees: it never returns an
//! error and never panics across the boundary. Gatekeeper denial, worker
//! timeout, crash, snippet failure, and normalization failure all become
//! `Outcome` values inside an immutable `AttemptRecord`. The engine
//! performs no internal retry; re-running a snippet is a caller policy.

use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};

use lancet_core::{
    normalize, AttemptId, AttemptRecord, ContentHash, DatasetHandle, ExecLimits, Outcome,
    RawSentinels, ResourceKind, Snippet,
};
use lancet_policy::{first_denied, AllowListRegistry};

use crate::backend::{WireReport, WorkerBackend, WorkerRun};
use crate::context::{ContextBuilder, ContextOptions};

/// Upper bound on failure message length in outcomes.
pub const MAX_MESSAGE_LEN: usize = 2048;

/// Runs execution attempts against a worker backend.
///
/// # Cancel Safety
/// Cancel safe. Dropping the future kills an in-flight worker via the
/// backend's `kill_on_drop` guarantee.
pub struct AttemptRunner<B: WorkerBackend> {
    backend: B,
}

impl<B: WorkerBackend> AttemptRunner<B> {
    /// Create a runner with the given backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Execute one attempt with a fresh attempt id.
    pub async fn execute(
        &self,
        snippet: &Snippet,
        dataset: &DatasetHandle,
        registry: &AllowListRegistry,
        limits: &ExecLimits,
        options: &ContextOptions,
    ) -> AttemptRecord {
        self.execute_as(AttemptId::new(), snippet, dataset, registry, limits, options)
            .await
    }

    /// Execute one attempt under a caller-assigned attempt id.
    ///
    /// Every failure path becomes an [`Outcome`] value in the returned
    /// record — this method does not return `Result` by design.
    pub async fn execute_as(
        &self,
        id: AttemptId,
        snippet: &Snippet,
        dataset: &DatasetHandle,
        registry: &AllowListRegistry,
        limits: &ExecLimits,
        options: &ContextOptions,
    ) -> AttemptRecord {
        let started_at = Utc::now();
        let wall_start = Instant::now();
        let snippet_hash = compute_hash(snippet.source().as_bytes());
        let dataset_fingerprint = compute_hash(dataset.to_json().to_string().as_bytes());

        tracing::info!(
            attempt = %id,
            snippet_hash = %snippet_hash,
            rows = dataset.row_count(),
            "starting execution attempt"
        );

        let outcome = self
            .run_attempt(snippet, dataset, registry, limits, options)
            .await;
        let duration = wall_start.elapsed();

        tracing::info!(
            attempt = %id,
            outcome = outcome_label(&outcome),
            elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "attempt complete"
        );

        AttemptRecord::new(id, snippet_hash, dataset_fingerprint, started_at, duration, outcome)
    }

    async fn run_attempt(
        &self,
        snippet: &Snippet,
        dataset: &DatasetHandle,
        registry: &AllowListRegistry,
        limits: &ExecLimits,
        options: &ContextOptions,
    ) -> Outcome {
        // Denied acquisitions abort before any worker exists: no snippet
        // statement executes, and the result is deterministic for a
        // given snippet and registry.
        if let Some(capability) = first_denied(snippet.source(), registry) {
            return Outcome::BlockedCapability { capability };
        }

        let program = match ContextBuilder::build(snippet, dataset, registry, limits, options) {
            Ok(program) => program,
            Err(e) => {
                return Outcome::RuntimeFailure {
                    category: "context_build".to_owned(),
                    message: truncate_message(&e.to_string()),
                }
            }
        };

        match self.backend.run(&program, limits).await {
            Ok(WorkerRun::Finished { report, .. }) => classify_report(report),
            Ok(WorkerRun::TimedOut { elapsed }) => Outcome::Timeout { elapsed },
            Ok(WorkerRun::Crashed { exit_code, detail, .. }) => Outcome::RuntimeFailure {
                category: "worker_crash".to_owned(),
                message: truncate_message(&match exit_code {
                    Some(code) => format!("worker exited with code {code}: {detail}"),
                    None => format!("worker killed by signal: {detail}"),
                }),
            },
            Err(e) => Outcome::RuntimeFailure {
                category: "worker_spawn".to_owned(),
                message: truncate_message(&e.to_string()),
            },
        }
    }
}

/// Maps a worker's wire report to the outcome the orchestrator consumes.
fn classify_report(report: WireReport) -> Outcome {
    match report {
        WireReport::Completed { result, visualization } => {
            match normalize(&RawSentinels::new(result, visualization)) {
                Ok(normalized) => Outcome::Success { result: normalized },
                Err(e) => Outcome::SerializationError { reason: truncate_message(&e.to_string()) },
            }
        }
        WireReport::Blocked { capability } => Outcome::BlockedCapability { capability },
        WireReport::Failed { category, message } => Outcome::RuntimeFailure {
            category,
            message: truncate_message(&message),
        },
        WireReport::MemoryExceeded => {
            Outcome::ResourceExceeded { kind: ResourceKind::Memory }
        }
        WireReport::Unserializable { reason } => {
            Outcome::SerializationError { reason: truncate_message(&reason) }
        }
    }
}

/// Compute the SHA-256 hash of a byte slice.
#[must_use]
pub fn compute_hash(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentHash::new(hasher.finalize().into())
}

/// Bound a failure message to [`MAX_MESSAGE_LEN`] bytes, cutting on a
/// character boundary.
#[must_use]
pub fn truncate_message(text: &str) -> String {
    if text.len() <= MAX_MESSAGE_LEN {
        return text.to_owned();
    }
    let mut end = MAX_MESSAGE_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Success { .. } => "success",
        Outcome::BlockedCapability { .. } => "blocked_capability",
        Outcome::Timeout { .. } => "timeout",
        Outcome::ResourceExceeded { .. } => "resource_exceeded",
        Outcome::RuntimeFailure { .. } => "runtime_failure",
        Outcome::SerializationError { .. } => "serialization_error",
        _ => "unknown",
    }
}
