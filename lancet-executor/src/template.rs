//! Validated placeholder substitution for the worker harness.
//!
//! The harness is assembled from a structured template with `@@NAME@@`
//! placeholders, never from raw nested string concatenation: every
//! placeholder must be declared, every declared placeholder must be
//! filled, and substituted values are treated as opaque data (they are
//! never rescanned for placeholders).

use std::collections::{BTreeMap, BTreeSet};

/// Errors produced while parsing or rendering a harness template.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateError {
    /// A `@@` marker without a closing `@@` on the same template.
    #[error("unterminated placeholder at byte {offset}")]
    Unterminated { offset: usize },

    /// A placeholder name with characters outside `[A-Z0-9_]`.
    #[error("invalid placeholder name '{name}'")]
    InvalidName { name: String },

    /// A render value for a placeholder the template does not declare.
    #[error("unknown placeholder key '{key}'")]
    UnknownKey { key: String },

    /// A declared placeholder with no render value.
    #[error("placeholder '{name}' was not filled")]
    Unfilled { name: String },
}

/// One token of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// A parsed harness template.
#[derive(Debug, Clone)]
pub struct HarnessTemplate {
    segments: Vec<Segment>,
    placeholders: BTreeSet<String>,
}

impl HarnessTemplate {
    /// Parses a template, validating every placeholder name.
    ///
    /// # Errors
    /// Returns [`TemplateError::Unterminated`] for an unpaired `@@`
    /// marker and [`TemplateError::InvalidName`] for a malformed name.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut placeholders = BTreeSet::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("@@") {
            let after = &rest[start + 2..];
            let Some(len) = after.find("@@") else {
                return Err(TemplateError::Unterminated { offset: offset + start });
            };
            let name = &after[..len];
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
            if !valid {
                return Err(TemplateError::InvalidName { name: name.to_owned() });
            }
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_owned()));
            }
            segments.push(Segment::Placeholder(name.to_owned()));
            placeholders.insert(name.to_owned());
            let consumed = start + 2 + len + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_owned()));
        }
        Ok(Self { segments, placeholders })
    }

    /// Returns the declared placeholder names.
    #[must_use]
    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    /// Renders the template with the given values.
    ///
    /// Values are data: a value containing `@@` renders verbatim.
    ///
    /// # Errors
    /// Returns [`TemplateError::UnknownKey`] for a value with no
    /// matching placeholder and [`TemplateError::Unfilled`] for a
    /// placeholder with no value.
    pub fn render(&self, values: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
        if let Some(key) = values.keys().find(|k| !self.placeholders.contains(**k)) {
            return Err(TemplateError::UnknownKey { key: (*key).to_owned() });
        }
        if let Some(name) = self.placeholders.iter().find(|p| !values.contains_key(p.as_str())) {
            return Err(TemplateError::Unfilled { name: name.clone() });
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some(value) = values.get(name.as_str()) {
                        out.push_str(value);
                    }
                }
            }
        }
        Ok(out)
    }
}
