//! The capability allow-list registry.
//!
//! Loaded once at startup from a fixed, reviewable JSON document and
//! never mutated afterwards. Deny-by-default is the only posture that
//! stays safe as the transitive dependencies of approved libraries
//! evolve: an unknown name is always `Denied`.

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// How a rule's capability name matches an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MatchRule {
    /// The acquisition must equal the capability name exactly.
    Exact,
    /// The acquisition is the capability name or a dotted descendant of
    /// it (`"numpy"` matches `numpy` and `numpy.random`, never
    /// `numpyish`).
    Prefix,
}

/// What a matching rule grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Classification {
    /// The capability is fully usable by the snippet.
    Approved,
    /// The acquisition succeeds but yields an inert placeholder whose
    /// every attribute access or call raises a blocked-capability
    /// condition. Lets approved libraries satisfy benign transitive
    /// acquisitions without granting any behavior.
    InertStub,
}

/// One allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AllowRule {
    /// Capability name the rule matches.
    pub capability: String,
    /// Exact or prefix matching.
    pub matcher: MatchRule,
    /// Approved or inert-stub classification.
    #[serde(rename = "class")]
    pub classification: Classification,
}

impl AllowRule {
    /// Creates a rule.
    pub fn new(
        capability: impl Into<String>,
        matcher: MatchRule,
        classification: Classification,
    ) -> Self {
        Self { capability: capability.into(), matcher, classification }
    }
}

/// The gatekeeper's answer for one capability acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Acquisition proceeds with full behavior.
    Allowed,
    /// Acquisition yields an inert stub.
    Stubbed,
    /// Acquisition aborts the attempt.
    Denied,
}

#[derive(Debug, Deserialize)]
struct RegistryConfig {
    rules: Vec<AllowRule>,
}

/// An immutable, concurrently shareable capability allow-list.
#[derive(Debug, Clone)]
pub struct AllowListRegistry {
    rules: Vec<AllowRule>,
}

impl AllowListRegistry {
    /// Builds a registry from validated rules.
    ///
    /// # Errors
    /// Returns [`PolicyError::EmptyCapability`] for a blank capability
    /// name and [`PolicyError::DuplicateRule`] when two rules share the
    /// same `(capability, matcher)` pair.
    pub fn new(rules: Vec<AllowRule>) -> Result<Self, PolicyError> {
        for (i, rule) in rules.iter().enumerate() {
            if rule.capability.trim().is_empty() {
                return Err(PolicyError::EmptyCapability { index: i });
            }
            let duplicate = rules[..i]
                .iter()
                .any(|r| r.capability == rule.capability && r.matcher == rule.matcher);
            if duplicate {
                return Err(PolicyError::DuplicateRule { capability: rule.capability.clone() });
            }
        }
        Ok(Self { rules })
    }

    /// Parses a registry from its JSON document form.
    ///
    /// # Errors
    /// Returns [`PolicyError::Parse`] for malformed JSON and the
    /// validation errors of [`AllowListRegistry::new`].
    pub fn from_json_str(json: &str) -> Result<Self, PolicyError> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        Self::new(config.rules)
    }

    /// Reads a registry from a JSON config file.
    ///
    /// # Errors
    /// Returns [`PolicyError::Io`] if the file cannot be read, plus the
    /// errors of [`AllowListRegistry::from_json_str`].
    pub fn from_path(path: &Path) -> Result<Self, PolicyError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Returns the registry embedded in this crate
    /// (`config/allowlist.json`): analysis and visualization
    /// capabilities, plus inert stubs for their benign transitive
    /// acquisitions.
    ///
    /// # Panics
    /// Never panics — the embedded config is validated by this crate's
    /// tests.
    #[must_use]
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<AllowListRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            #[expect(clippy::expect_used, reason = "embedded config is validated by tests")]
            Self::from_json_str(include_str!("../config/allowlist.json"))
                .expect("embedded allow-list config is valid")
        })
    }

    /// Decides one capability acquisition.
    ///
    /// Precedence is fixed: an exact rule wins over any prefix rule;
    /// among matching prefix rules the longest capability name wins, so
    /// rule order in the config never matters. No matching rule means
    /// `Denied`.
    #[must_use]
    pub fn authorize(&self, name: &str) -> Decision {
        let exact = self
            .rules
            .iter()
            .find(|r| r.matcher == MatchRule::Exact && r.capability == name);
        if let Some(rule) = exact {
            return Self::grant(rule.classification);
        }

        let best_prefix = self
            .rules
            .iter()
            .filter(|r| r.matcher == MatchRule::Prefix && prefix_matches(&r.capability, name))
            .max_by_key(|r| r.capability.len());
        match best_prefix {
            Some(rule) => Self::grant(rule.classification),
            None => Decision::Denied,
        }
    }

    /// Returns the rules, for rendering into a worker's capability gate.
    #[must_use]
    pub fn rules(&self) -> &[AllowRule] {
        &self.rules
    }

    fn grant(class: Classification) -> Decision {
        match class {
            Classification::Approved => Decision::Allowed,
            Classification::InertStub => Decision::Stubbed,
        }
    }
}

/// `capability` matches `name` when equal or when `name` is a dotted
/// descendant. `numpyish` never matches a `numpy` prefix rule.
fn prefix_matches(capability: &str, name: &str) -> bool {
    name == capability
        || (name.len() > capability.len()
            && name.starts_with(capability)
            && name.as_bytes().get(capability.len()) == Some(&b'.'))
}
