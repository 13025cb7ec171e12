use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AttemptId, ContentHash};
use crate::normalize::NormalizedResult;

/// The discriminated result of one execution attempt.
///
/// Every attempt produces exactly one `Outcome` — success and all
/// failure categories alike become values, never exceptions across the
/// orchestrator boundary. All variants are terminal for the attempt;
/// retry is a caller-level policy decision and is never performed by
/// the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Outcome {
    /// The snippet completed and its result normalized cleanly.
    Success {
        /// The normalized result value.
        result: NormalizedResult,
    },
    /// The snippet acquired (or tried to acquire) a capability that the
    /// allow-list denies. Deterministic for a given snippet and registry.
    BlockedCapability {
        /// The capability name as the snippet requested it.
        capability: String,
    },
    /// The worker exceeded the wall-clock ceiling and was force-killed.
    Timeout {
        /// Measured wall-clock time at the moment of the kill.
        elapsed: Duration,
    },
    /// The worker breached a resource ceiling other than wall-clock time.
    ResourceExceeded {
        /// Which ceiling was breached.
        kind: ResourceKind,
    },
    /// The snippet raised an uncaught error, or the worker itself failed.
    RuntimeFailure {
        /// Stable machine-readable category (e.g. `"division_by_zero"`).
        category: String,
        /// Human-readable detail, truncated to a bounded length.
        message: String,
    },
    /// The snippet produced a value outside the normalization policy
    /// table. Deterministic; reported explicitly rather than silently
    /// mapped to an empty result.
    SerializationError {
        /// What made the value unrepresentable.
        reason: String,
    },
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Resource ceilings that can be breached besides wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ResourceKind {
    /// The worker hit its address-space ceiling.
    Memory,
    /// The worker hit a CPU-time ceiling.
    Cpu,
}

/// A complete audit record of a single execution attempt.
///
/// Records are immutable once created. The snippet hash and dataset
/// fingerprint make attempts against identical inputs comparable, which
/// is how determinism regressions are detected downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AttemptRecord {
    /// Unique identifier for this attempt.
    pub id: AttemptId,
    /// SHA-256 of the snippet source text.
    pub snippet_hash: ContentHash,
    /// SHA-256 of the serialized dataset rows.
    pub dataset_fingerprint: ContentHash,
    /// When the attempt began.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the whole attempt.
    pub duration: Duration,
    /// The attempt's outcome.
    pub outcome: Outcome,
}

impl AttemptRecord {
    /// Create a new attempt record.
    #[must_use]
    pub fn new(
        id: AttemptId,
        snippet_hash: ContentHash,
        dataset_fingerprint: ContentHash,
        started_at: DateTime<Utc>,
        duration: Duration,
        outcome: Outcome,
    ) -> Self {
        Self { id, snippet_hash, dataset_fingerprint, started_at, duration, outcome }
    }
}
