//! Result normalization policy.
//!
//! Whatever a snippet leaves in its sentinels is converted into exactly
//! one canonical, serializable shape before it crosses back to the
//! orchestrator. The predecessor of this engine suffered recurring
//! scalar-vs-mapping mismatches in the presentation layer; one policy
//! table, applied in one place, removes that class of defect.

use std::collections::BTreeMap;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of table rows retained in a normalized result.
pub const MAX_TABLE_ROWS: usize = 500;

/// Maximum nesting depth accepted while normalizing a value.
const MAX_DEPTH: usize = 32;

/// Errors produced while normalizing a raw result.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NormalizeError {
    /// The value has no representation in the policy table.
    #[error("unrepresentable result: {reason}")]
    Unrepresentable { reason: String },

    /// The value nests deeper than [`MAX_DEPTH`].
    #[error("result nesting exceeds the depth bound")]
    DepthExceeded,
}

/// The raw sentinel values captured from a completed worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RawSentinels {
    /// Final value of the `result` sentinel; null when left unset.
    pub result: Value,
    /// Final value of the `visualization` sentinel; null when left unset.
    pub visualization: Value,
}

impl RawSentinels {
    /// Wraps the two sentinel values captured from a worker.
    #[must_use]
    pub fn new(result: Value, visualization: Value) -> Self {
        Self { result, visualization }
    }
}

/// A plain scalar carried in a normalized result.
///
/// Host numeric wrapper types are coerced to plain primitives by the
/// worker harness before they reach this point, so only native JSON
/// scalars appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum ScalarValue {
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A text value.
    Text(String),
}

/// The canonical result shape consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum NormalizedResult {
    /// Both sentinels were left unset.
    Empty,
    /// A single scalar value.
    Scalar {
        /// The scalar.
        value: ScalarValue,
    },
    /// A key-value mapping; values are recursively normalized.
    Mapping {
        /// Entries in key order.
        entries: BTreeMap<String, NormalizedResult>,
    },
    /// A tabular result, capped at [`MAX_TABLE_ROWS`] rows.
    Table {
        /// The retained row objects.
        rows: Vec<Map<String, Value>>,
        /// `true` when rows were dropped to honor the cap.
        truncated: bool,
    },
    /// An opaque visualization payload. The engine confirms the payload
    /// serializes and passes it through without interpreting it.
    Visualization {
        /// Base64 of the serialized visualization document.
        encoding: String,
    },
}

/// Applies the normalization policy table to raw sentinel values.
///
/// When both sentinels are set, the visualization wins and the result
/// value is ignored for the attempt.
///
/// # Errors
/// Returns [`NormalizeError::Unrepresentable`] for values outside the
/// policy table (e.g. an array of non-objects) and
/// [`NormalizeError::DepthExceeded`] for hostile deeply-nested values.
/// Callers surface both as a serialization-error outcome — never as a
/// silent empty result.
pub fn normalize(raw: &RawSentinels) -> Result<NormalizedResult, NormalizeError> {
    if !raw.visualization.is_null() {
        let bytes = serde_json::to_vec(&raw.visualization).map_err(|e| {
            NormalizeError::Unrepresentable { reason: format!("visualization: {e}") }
        })?;
        let encoding = base64::engine::general_purpose::STANDARD.encode(bytes);
        return Ok(NormalizedResult::Visualization { encoding });
    }
    normalize_value(&raw.result, 0)
}

fn normalize_value(value: &Value, depth: usize) -> Result<NormalizedResult, NormalizeError> {
    if depth > MAX_DEPTH {
        return Err(NormalizeError::DepthExceeded);
    }
    match value {
        Value::Null => Ok(NormalizedResult::Empty),
        Value::Bool(b) => Ok(NormalizedResult::Scalar { value: ScalarValue::Bool(*b) }),
        Value::Number(n) => normalize_number(n),
        Value::String(s) => Ok(NormalizedResult::Scalar { value: ScalarValue::Text(s.clone()) }),
        Value::Object(map) => {
            let mut entries = BTreeMap::new();
            for (key, val) in map {
                entries.insert(key.clone(), normalize_value(val, depth + 1)?);
            }
            Ok(NormalizedResult::Mapping { entries })
        }
        Value::Array(items) => normalize_table(items),
    }
}

fn normalize_number(n: &serde_json::Number) -> Result<NormalizedResult, NormalizeError> {
    if let Some(i) = n.as_i64() {
        return Ok(NormalizedResult::Scalar { value: ScalarValue::Int(i) });
    }
    if let Some(f) = n.as_f64() {
        return Ok(NormalizedResult::Scalar { value: ScalarValue::Float(f) });
    }
    Err(NormalizeError::Unrepresentable { reason: format!("numeric value {n} out of range") })
}

/// An array is tabular exactly when every element is an object. Anything
/// else (mixed arrays, arrays of scalars) is outside the policy table.
fn normalize_table(items: &[Value]) -> Result<NormalizedResult, NormalizeError> {
    let mut rows = Vec::with_capacity(items.len().min(MAX_TABLE_ROWS));
    for (i, item) in items.iter().enumerate() {
        let Value::Object(row) = item else {
            return Err(NormalizeError::Unrepresentable {
                reason: format!("array element {i} is not a row object"),
            });
        };
        if rows.len() < MAX_TABLE_ROWS {
            rows.push(row.clone());
        }
    }
    Ok(NormalizedResult::Table { rows, truncated: items.len() > MAX_TABLE_ROWS })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result_only(value: Value) -> RawSentinels {
        RawSentinels::new(value, Value::Null)
    }

    #[test]
    fn unset_sentinels_normalize_to_empty() {
        let normalized = match normalize(&result_only(Value::Null)) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(normalized, NormalizedResult::Empty);
    }

    #[test]
    fn scalar_forty_two_normalizes_to_int_scalar() {
        let normalized = match normalize(&result_only(json!(42))) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(normalized, NormalizedResult::Scalar { value: ScalarValue::Int(42) });
    }

    #[test]
    fn mapping_values_normalize_recursively_with_native_numerics() {
        let normalized = match normalize(&result_only(json!({"a": 1, "b": 2}))) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        let NormalizedResult::Mapping { entries } = normalized else {
            panic!("expected mapping");
        };
        assert_eq!(
            entries.get("a"),
            Some(&NormalizedResult::Scalar { value: ScalarValue::Int(1) })
        );
        assert_eq!(
            entries.get("b"),
            Some(&NormalizedResult::Scalar { value: ScalarValue::Int(2) })
        );
    }

    #[test]
    fn large_table_truncates_to_row_cap() {
        let rows: Vec<Value> = (0..10_000).map(|i| json!({"n": i})).collect();
        let normalized = match normalize(&result_only(Value::Array(rows))) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        let NormalizedResult::Table { rows, truncated } = normalized else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), MAX_TABLE_ROWS);
        assert!(truncated, "10,000 rows must be flagged truncated");
    }

    #[test]
    fn small_table_is_not_truncated() {
        let normalized = match normalize(&result_only(json!([{"a": 1}, {"a": 2}]))) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(
            normalized,
            NormalizedResult::Table {
                rows: vec![
                    json!({"a": 1}).as_object().cloned().unwrap_or_default(),
                    json!({"a": 2}).as_object().cloned().unwrap_or_default(),
                ],
                truncated: false,
            }
        );
    }

    #[test]
    fn empty_array_is_a_degenerate_table() {
        let normalized = match normalize(&result_only(json!([]))) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(normalized, NormalizedResult::Table { rows: vec![], truncated: false });
    }

    #[test]
    fn array_of_scalars_is_unrepresentable_never_silently_empty() {
        let result = normalize(&result_only(json!([1, 2, 3])));
        assert!(
            matches!(result, Err(NormalizeError::Unrepresentable { .. })),
            "scalar arrays are outside the policy table"
        );
    }

    #[test]
    fn visualization_sentinel_wins_and_round_trips_through_base64() {
        let raw = RawSentinels::new(json!(1), json!({"mark": "bar", "data": [1, 2]}));
        let normalized = match normalize(&raw) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        let NormalizedResult::Visualization { encoding } = normalized else {
            panic!("expected visualization to win over the result sentinel");
        };
        let bytes = match base64::engine::general_purpose::STANDARD.decode(encoding) {
            Ok(b) => b,
            Err(e) => panic!("encoding must be valid base64: {e}"),
        };
        let back: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => panic!("encoding must hold the serialized payload: {e}"),
        };
        assert_eq!(back, json!({"mark": "bar", "data": [1, 2]}));
    }

    #[test]
    fn deep_nesting_is_rejected_not_overflowed() {
        let mut value = json!(0);
        for _ in 0..100 {
            value = json!({ "inner": value });
        }
        let result = normalize(&result_only(value));
        assert!(
            matches!(result, Err(NormalizeError::DepthExceeded)),
            "hostile nesting must hit the depth bound"
        );
    }

    #[test]
    fn normalization_is_deterministic_for_equal_inputs() {
        let raw = result_only(json!({"mean_age": 52.4, "n": 120}));
        let first = normalize(&raw);
        let second = normalize(&raw);
        match (first, second) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "equal inputs must normalize equally"),
            (a, b) => panic!("unexpected errors: {a:?} / {b:?}"),
        }
    }

    proptest::proptest! {
        #[test]
        fn proptest_normalize_never_panics_on_arbitrary_json(text in "\\PC{0,256}") {
            // Any parseable JSON document must either normalize or fail
            // with a typed error; panics are the only forbidden outcome.
            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                let _ = normalize(&RawSentinels::new(value.clone(), Value::Null));
                let _ = normalize(&RawSentinels::new(Value::Null, value));
            }
        }

        #[test]
        fn proptest_tables_never_exceed_row_cap(len in 0usize..2000) {
            let rows: Vec<Value> = (0..len).map(|i| serde_json::json!({"i": i})).collect();
            let normalized = normalize(&RawSentinels::new(Value::Array(rows), Value::Null));
            if let Ok(NormalizedResult::Table { rows, truncated }) = normalized {
                proptest::prop_assert!(rows.len() <= MAX_TABLE_ROWS);
                proptest::prop_assert_eq!(truncated, len > MAX_TABLE_ROWS);
            } else {
                proptest::prop_assert!(false, "row arrays must normalize to tables");
            }
        }
    }
}
