use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// A read-only snapshot of tabular patient records.
///
/// One snapshot is shared by every attempt in a session. The handle is a
/// cheap `Arc` clone; there is no mutation API, and workers operate on a
/// serialized copy of the rows, so the host data cannot be altered or
/// persisted from inside a snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DatasetHandle {
    inner: Arc<DatasetSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DatasetSnapshot {
    /// Human-readable dataset name (e.g. `"cohort-2026-q1"`).
    name: String,
    /// Declared column names, in display order.
    columns: Vec<String>,
    /// Row objects; every key must be a declared column.
    rows: Vec<Map<String, Value>>,
}

impl DatasetHandle {
    /// Creates a validated dataset snapshot.
    ///
    /// Rows may omit columns (absent values read as null inside the
    /// worker) but must never introduce undeclared keys.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDataset`] if the name is empty, a
    /// column name is empty or duplicated, or a row contains a key that
    /// is not a declared column.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Map<String, Value>>,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::InvalidDataset {
                reason: "dataset name must not be empty".to_owned(),
            });
        }
        for (i, column) in columns.iter().enumerate() {
            if column.is_empty() {
                return Err(CoreError::InvalidDataset {
                    reason: format!("column {i} has an empty name"),
                });
            }
            if columns[..i].contains(column) {
                return Err(CoreError::InvalidDataset {
                    reason: format!("duplicate column '{column}'"),
                });
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if let Some(key) = row.keys().find(|k| !columns.contains(k)) {
                return Err(CoreError::InvalidDataset {
                    reason: format!("row {i} has undeclared column '{key}'"),
                });
            }
        }
        Ok(Self {
            inner: Arc::new(DatasetSnapshot { name, columns, rows }),
        })
    }

    /// Returns the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the declared column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.inner.columns
    }

    /// Returns the number of rows in the snapshot.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.inner.rows.len()
    }

    /// Returns the row objects.
    #[must_use]
    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.inner.rows
    }

    /// Serializes the rows as the JSON array shipped into a worker.
    ///
    /// The worker receives its own copy; nothing it does to that copy
    /// can reach the snapshot behind this handle.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.inner.rows.iter().cloned().map(Value::Object).collect())
    }
}
