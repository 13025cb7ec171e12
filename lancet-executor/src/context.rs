//! Execution context assembly.
//!
//! Builds the complete worker program for one attempt: the harness
//! template rendered with the dataset copy, the snippet, the registry's
//! gate decisions, and the per-call options. The namespace the snippet
//! sees is defined entirely here and in `harness.py` — safe primitives,
//! the dataset under the fixed name `records`, and the two pre-bound
//! sentinels `result` and `visualization`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use lancet_core::{DatasetHandle, ExecLimits, Snippet};
use lancet_policy::AllowListRegistry;

use crate::backend::WorkerProgram;
use crate::template::HarnessTemplate;
use crate::ExecutorError;

/// Upper bound on the assembled program size.
pub const MAX_PROGRAM_BYTES: usize = 8 * 1024 * 1024;

const HARNESS_TEMPLATE: &str = include_str!("harness.py");

/// Per-call execution options.
///
/// Passed explicitly into every build; there is no process-wide mode
/// switch. The predecessor system toggled a global offline flag and
/// paid for it with nondeterministic test hangs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContextOptions {
    /// When `true`, the worker's gate hard-blocks the known transport
    /// capabilities regardless of registry classification.
    pub offline: bool,
}

impl ContextOptions {
    /// Offline options — the posture for production patient data.
    #[must_use]
    pub fn offline() -> Self {
        Self { offline: true }
    }

    /// Options that defer entirely to the registry.
    #[must_use]
    pub fn registry_only() -> Self {
        Self { offline: false }
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self::offline()
    }
}

/// Assembles worker programs.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder;

impl ContextBuilder {
    /// Builds the worker program for one attempt.
    ///
    /// Every value lands in the template as a JSON-encoded literal, so
    /// snippet or dataset content can never alter the harness structure.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Template`] if rendering fails and
    /// [`ExecutorError::ProgramTooLarge`] if the assembled program
    /// exceeds [`MAX_PROGRAM_BYTES`].
    pub fn build(
        snippet: &Snippet,
        dataset: &DatasetHandle,
        registry: &AllowListRegistry,
        limits: &ExecLimits,
        options: &ContextOptions,
    ) -> Result<WorkerProgram, ExecutorError> {
        let template = harness_template()?;

        let rules_json = to_json_string(registry.rules())?;
        let dataset_json = dataset.to_json().to_string();

        let mut values: BTreeMap<&str, String> = BTreeMap::new();
        values.insert("RULES_JSON", string_literal(&rules_json)?);
        values.insert("DATASET_JSON", string_literal(&dataset_json)?);
        values.insert("SNIPPET_JSON", string_literal(snippet.source())?);
        values.insert("OFFLINE", python_bool(options.offline).to_owned());
        values.insert("MEMORY_CEILING", limits.memory_ceiling_bytes.to_string());

        let source = template.render(&values)?;
        if source.len() > MAX_PROGRAM_BYTES {
            return Err(ExecutorError::ProgramTooLarge { bytes: source.len() });
        }
        Ok(WorkerProgram::new(source))
    }
}

fn harness_template() -> Result<&'static HarnessTemplate, ExecutorError> {
    static TEMPLATE: OnceLock<Result<HarnessTemplate, crate::template::TemplateError>> =
        OnceLock::new();
    TEMPLATE
        .get_or_init(|| HarnessTemplate::parse(HARNESS_TEMPLATE))
        .as_ref()
        .map_err(|e| ExecutorError::Template(e.clone()))
}

fn to_json_string<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ExecutorError> {
    serde_json::to_string(value)
        .map_err(|e| ExecutorError::SpawnFailed(format!("registry serialization: {e}")))
}

/// Encodes text as a JSON string literal, which is also a valid Python
/// string literal. This is the only way data enters the harness.
fn string_literal(text: &str) -> Result<String, ExecutorError> {
    serde_json::to_string(text)
        .map_err(|e| ExecutorError::SpawnFailed(format!("literal encoding: {e}")))
}

const fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
