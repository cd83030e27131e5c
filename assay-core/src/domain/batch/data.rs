// assay-core/src/domain/batch/data.rs
//
// Opaque in-memory payloads carried by runtime requests and batches.

use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A materialized or caller-supplied dataset this layer never looks inside.
pub trait BatchData: fmt::Debug + Send + Sync {
    /// Rendered in place of the payload whenever a request or batch is serialized.
    fn type_name(&self) -> &str;

    /// Independent copy of the payload, or `None` when it cannot be duplicated.
    fn deep_clone(&self) -> Option<BatchDataHandle> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

pub type BatchDataHandle = Arc<dyn BatchData>;

/// Copies a payload when it supports it, otherwise shares the same handle.
pub fn safe_deep_copy(data: &BatchDataHandle) -> BatchDataHandle {
    data.deep_clone().unwrap_or_else(|| Arc::clone(data))
}

/// Row-oriented in-memory table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Builds a table from JSON objects; columns follow first appearance.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_handle(self) -> BatchDataHandle {
        Arc::new(self)
    }
}

impl BatchData for RecordSet {
    fn type_name(&self) -> &str {
        "RecordSet"
    }

    fn deep_clone(&self) -> Option<BatchDataHandle> {
        Some(Arc::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Opaque;

    impl BatchData for Opaque {
        fn type_name(&self) -> &str {
            "Opaque"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_from_records_unions_columns() {
        let records = vec![
            json!({"id": 1, "name": "a"}).as_object().cloned().unwrap(),
            json!({"id": 2, "email": "b@x.io"}).as_object().cloned().unwrap(),
        ];
        let set = RecordSet::from_records(&records);
        assert_eq!(set.columns().to_vec(), vec!["id", "name", "email"]);
        assert_eq!(set.rows()[1], vec![json!(2), Value::Null, json!("b@x.io")]);
    }

    #[test]
    fn test_safe_deep_copy_copies_when_possible() {
        let handle = RecordSet::new(vec!["a".into()], vec![vec![json!(1)]]).into_handle();
        let copy = safe_deep_copy(&handle);
        assert!(!Arc::ptr_eq(&handle, &copy));
        let original = handle.as_any().downcast_ref::<RecordSet>().unwrap();
        let copied = copy.as_any().downcast_ref::<RecordSet>().unwrap();
        assert_eq!(original, copied);
    }

    #[test]
    fn test_safe_deep_copy_shares_opaque_payloads() {
        let handle: BatchDataHandle = Arc::new(Opaque);
        let copy = safe_deep_copy(&handle);
        assert!(Arc::ptr_eq(&handle, &copy));
    }
}
