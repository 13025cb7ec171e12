//! Core types for the Lancet sandboxed analysis engine.
//!
//! Defines the fundamental domain types: snippets, dataset snapshots,
//! execution limits, the per-attempt `Outcome` discriminated union, and
//! the result normalization policy.
//!
//! See `DESIGN.md` at the workspace root for design rationale.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod dataset;
pub mod error;
pub mod examples;
pub mod id;
pub mod limits;
pub mod normalize;
pub mod outcome;
pub mod snippet;

pub use dataset::DatasetHandle;
pub use error::CoreError;
pub use id::{AttemptId, ContentHash, SessionId};
pub use limits::{ExecLimits, MIN_MEMORY_CEILING_BYTES};
pub use normalize::{
    normalize, NormalizeError, NormalizedResult, RawSentinels, ScalarValue, MAX_TABLE_ROWS,
};
pub use outcome::{AttemptRecord, Outcome, ResourceKind};
pub use snippet::Snippet;
