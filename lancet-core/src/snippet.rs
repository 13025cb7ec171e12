use serde::{Deserialize, Serialize};

/// The source text submitted for one execution attempt.
///
/// Snippets are immutable: the engine reads the text to scan capability
/// acquisitions and to assemble the worker program, and never rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Snippet(String);

impl Snippet {
    /// Creates a snippet from any string-like value.
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Returns the source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.0
    }

    /// Returns the source length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the snippet contains no source text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Snippet {
    fn from(source: String) -> Self {
        Self(source)
    }
}

impl From<&str> for Snippet {
    fn from(source: &str) -> Self {
        Self(source.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_preserves_source_verbatim() {
        let text = "result = sum(r[\"age\"] for r in records) / len(records)\n";
        let snippet = Snippet::new(text);
        assert_eq!(snippet.source(), text, "source must round-trip unchanged");
    }

    #[test]
    fn snippet_empty_reports_empty() {
        let snippet = Snippet::new("");
        assert!(snippet.is_empty());
        assert_eq!(snippet.len(), 0);
    }
}
