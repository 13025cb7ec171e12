//! Example instances demonstrating the schema.
//!
//! A small synthetic cohort and a few snippets, used by unit and
//! integration tests across the workspace. All patient data here is
//! fabricated.

use serde_json::{json, Map, Value};

use crate::dataset::DatasetHandle;
use crate::snippet::Snippet;

fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// Returns a six-row synthetic patient cohort.
///
/// Columns: `patient_id`, `age`, `systolic_bp`, `ldl`, `diagnosis`.
///
/// # Panics
/// Never panics — the rows are hard-coded to match the declared columns.
#[must_use]
pub fn example_cohort() -> DatasetHandle {
    let columns = ["patient_id", "age", "systolic_bp", "ldl", "diagnosis"]
        .iter()
        .map(|c| (*c).to_owned())
        .collect();
    let rows = vec![
        row(&[
            ("patient_id", json!("p-0001")),
            ("age", json!(54)),
            ("systolic_bp", json!(141)),
            ("ldl", json!(132.5)),
            ("diagnosis", json!("hypertension")),
        ]),
        row(&[
            ("patient_id", json!("p-0002")),
            ("age", json!(61)),
            ("systolic_bp", json!(128)),
            ("ldl", json!(101.0)),
            ("diagnosis", json!("hyperlipidemia")),
        ]),
        row(&[
            ("patient_id", json!("p-0003")),
            ("age", json!(47)),
            ("systolic_bp", json!(119)),
            ("ldl", json!(96.2)),
            ("diagnosis", json!("none")),
        ]),
        row(&[
            ("patient_id", json!("p-0004")),
            ("age", json!(72)),
            ("systolic_bp", json!(156)),
            ("ldl", json!(148.9)),
            ("diagnosis", json!("hypertension")),
        ]),
        row(&[
            ("patient_id", json!("p-0005")),
            ("age", json!(38)),
            ("systolic_bp", json!(112)),
            ("ldl", json!(88.4)),
            ("diagnosis", json!("none")),
        ]),
        row(&[
            ("patient_id", json!("p-0006")),
            ("age", json!(65)),
            ("systolic_bp", json!(147)),
            ("ldl", json!(121.7)),
            ("diagnosis", json!("diabetes")),
        ]),
    ];
    #[expect(clippy::expect_used, reason = "hard-coded rows match the declared columns")]
    DatasetHandle::new("example-cohort", columns, rows).expect("example cohort is valid")
}

/// A snippet computing the cohort's mean age as a scalar result.
#[must_use]
pub fn mean_age_snippet() -> Snippet {
    Snippet::new("result = sum(r[\"age\"] for r in records) / len(records)\n")
}

/// A snippet counting rows per diagnosis as a mapping result.
#[must_use]
pub fn diagnosis_counts_snippet() -> Snippet {
    Snippet::new(concat!(
        "counts = {}\n",
        "for r in records:\n",
        "    counts[r[\"diagnosis\"]] = counts.get(r[\"diagnosis\"], 0) + 1\n",
        "result = counts\n",
    ))
}

/// A snippet that divides by zero on its first statement.
#[must_use]
pub fn division_by_zero_snippet() -> Snippet {
    Snippet::new("result = 1 / 0\n")
}
