// assay-core/src/domain/batch/spec.rs

use serde_json::{Map, Value};

use super::data::BatchDataHandle;
use crate::domain::identity::IdDict;

/// Instructions an execution engine follows to fetch one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSpec {
    batch_data: Option<BatchDataHandle>,
    params: IdDict,
}

impl BatchSpec {
    pub const PATH: &'static str = "path";
    pub const QUERY: &'static str = "query";
    pub const READER_METHOD: &'static str = "reader_method";
    pub const SAMPLING_METHOD: &'static str = "sampling_method";
    pub const SAMPLING_KWARGS: &'static str = "sampling_kwargs";
    pub const SPLITTER_METHOD: &'static str = "splitter_method";
    pub const SPLITTER_KWARGS: &'static str = "splitter_kwargs";

    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a definition's passthrough; explicit keys set later win.
    pub fn from_passthrough(passthrough: Option<&Map<String, Value>>) -> Self {
        Self {
            batch_data: None,
            params: passthrough.cloned().map(IdDict::from).unwrap_or_default(),
        }
    }

    pub fn with_batch_data(mut self, data: BatchDataHandle) -> Self {
        self.batch_data = Some(data);
        self
    }

    pub fn with_query(self, query: impl Into<String>) -> Self {
        self.with(Self::QUERY, query.into())
    }

    pub fn with_path(self, path: impl Into<String>) -> Self {
        self.with(Self::PATH, path.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn batch_data(&self) -> Option<&BatchDataHandle> {
        self.batch_data.as_ref()
    }

    pub fn query(&self) -> Option<&str> {
        self.get_str(Self::QUERY)
    }

    pub fn path(&self) -> Option<&str> {
        self.get_str(Self::PATH)
    }

    pub fn reader_method(&self) -> Option<&str> {
        self.get_str(Self::READER_METHOD)
    }

    pub fn sampling_method(&self) -> Option<&str> {
        self.get_str(Self::SAMPLING_METHOD)
    }

    pub fn splitter_method(&self) -> Option<&str> {
        self.get_str(Self::SPLITTER_METHOD)
    }

    pub fn sampling_kwargs(&self) -> Option<&Map<String, Value>> {
        self.params.get(Self::SAMPLING_KWARGS).and_then(Value::as_object)
    }

    pub fn splitter_kwargs(&self) -> Option<&Map<String, Value>> {
        self.params.get(Self::SPLITTER_KWARGS).and_then(Value::as_object)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn params(&self) -> &IdDict {
        &self.params
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// JSON view; a live payload is rendered by its type name.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = self.params.as_map().clone();
        if let Some(data) = &self.batch_data {
            map.insert("batch_data".into(), Value::String(data.type_name().to_string()));
        }
        map
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::batch::data::RecordSet;
    use serde_json::json;

    #[test]
    fn test_passthrough_is_overridden_by_explicit_keys() {
        let passthrough = json!({"reader_method": "read_json", "sampling_method": "sample_using_limit"});
        let spec = BatchSpec::from_passthrough(passthrough.as_object())
            .with_path("/data/a.csv")
            .with(BatchSpec::READER_METHOD, "read_csv");

        assert_eq!(spec.path(), Some("/data/a.csv"));
        assert_eq!(spec.reader_method(), Some("read_csv"));
        assert_eq!(spec.sampling_method(), Some("sample_using_limit"));
    }

    #[test]
    fn test_json_map_renders_payload_type() {
        let spec = BatchSpec::new().with_batch_data(RecordSet::default().into_handle());
        assert_eq!(spec.to_json_map()["batch_data"], json!("RecordSet"));
    }
}
