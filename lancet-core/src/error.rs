/// Errors produced by the `lancet-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Execution limits failed validation.
    #[error("invalid limits: {reason}")]
    InvalidLimits { reason: String },

    /// A dataset snapshot failed validation.
    #[error("invalid dataset: {reason}")]
    InvalidDataset { reason: String },
}
