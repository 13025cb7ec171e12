use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Smallest memory ceiling that leaves room for an interpreter to start.
pub const MIN_MEMORY_CEILING_BYTES: u64 = 16 * 1024 * 1024;

/// Resource ceilings for one execution attempt.
///
/// There is deliberately no `Default` impl: the upstream documentation
/// for this engine's predecessor cited timeout figures ranging from
/// sub-second to several seconds, so callers must choose both values
/// explicitly rather than inherit a guessed constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ExecLimits {
    /// Wall-clock ceiling for the whole attempt. On expiry the worker is
    /// force-killed from outside; cooperative checks are not relied on.
    pub wall_clock_timeout: Duration,
    /// Address-space ceiling applied inside the worker before the
    /// snippet runs.
    pub memory_ceiling_bytes: u64,
}

impl ExecLimits {
    /// Creates validated limits.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidLimits`] for a zero timeout or a
    /// memory ceiling below [`MIN_MEMORY_CEILING_BYTES`].
    pub fn new(wall_clock_timeout: Duration, memory_ceiling_bytes: u64) -> Result<Self, CoreError> {
        if wall_clock_timeout.is_zero() {
            return Err(CoreError::InvalidLimits {
                reason: "wall clock timeout must be nonzero".to_owned(),
            });
        }
        if memory_ceiling_bytes < MIN_MEMORY_CEILING_BYTES {
            return Err(CoreError::InvalidLimits {
                reason: format!(
                    "memory ceiling {memory_ceiling_bytes} is below the {MIN_MEMORY_CEILING_BYTES}-byte floor"
                ),
            });
        }
        Ok(Self { wall_clock_timeout, memory_ceiling_bytes })
    }
}
