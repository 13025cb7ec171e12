/// Errors produced while loading or validating an allow-list registry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// A rule has a blank capability name.
    #[error("rule {index} has an empty capability name")]
    EmptyCapability { index: usize },

    /// Two rules share the same capability name and matcher.
    #[error("duplicate rule for capability '{capability}'")]
    DuplicateRule { capability: String },

    /// The registry config document is not valid JSON.
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// The registry config file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
