// assay-core/src/ports/execution_engine.rs

// What the core needs from something that can load and compute over data.
// The core never knows whether that is DuckDB, an in-memory table or a remote warehouse.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::domain::batch::{BatchDataHandle, BatchMarkers, BatchSpec};
use crate::domain::identity::IdDict;
use crate::error::AssayError;

/// (metric name, domain kwargs id, value kwargs id). Missing ids render as `"()"`.
pub type MetricId = (String, String, String);

/// A request for one metric over one domain (usually a batch).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricConfiguration {
    metric_name: String,
    metric_domain_kwargs: IdDict,
    metric_value_kwargs: IdDict,
}

impl MetricConfiguration {
    pub const TABLE_HEAD: &'static str = "table.head";
    pub const TABLE_ROW_COUNT: &'static str = "table.row_count";
    pub const TABLE_COLUMNS: &'static str = "table.columns";

    pub fn new(
        metric_name: impl Into<String>,
        metric_domain_kwargs: IdDict,
        metric_value_kwargs: IdDict,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            metric_domain_kwargs,
            metric_value_kwargs,
        }
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    pub fn metric_domain_kwargs(&self) -> &IdDict {
        &self.metric_domain_kwargs
    }

    pub fn metric_value_kwargs(&self) -> &IdDict {
        &self.metric_value_kwargs
    }

    /// Batch the metric is computed on, when the domain names one.
    pub fn batch_id(&self) -> Option<&str> {
        self.metric_domain_kwargs
            .get("batch_id")
            .and_then(Value::as_str)
    }

    pub fn id(&self) -> MetricId {
        let render = |ids: &IdDict| ids.to_id().unwrap_or_else(|| "()".to_string());
        (
            self.metric_name.clone(),
            render(&self.metric_domain_kwargs),
            render(&self.metric_value_kwargs),
        )
    }

    pub fn to_json_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert("metric_name".into(), Value::String(self.metric_name.clone()));
        dict.insert(
            "metric_domain_kwargs".into(),
            self.metric_domain_kwargs.clone().into(),
        );
        dict.insert(
            "metric_value_kwargs".into(),
            self.metric_value_kwargs.clone().into(),
        );
        dict
    }
}

impl fmt::Display for MetricConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, domain, value) = self.id();
        write!(f, "{}({}, {})", name, domain, value)
    }
}

pub trait ExecutionEngine: Send + Sync {
    fn engine_name(&self) -> &str;

    /// Fetches the data a batch spec points at and registers it under `batch_id`.
    fn load_batch_data(
        &self,
        batch_id: &str,
        batch_spec: &BatchSpec,
    ) -> Result<(BatchDataHandle, BatchMarkers), AssayError>;

    fn resolve_metrics(
        &self,
        metrics: &[MetricConfiguration],
    ) -> Result<HashMap<MetricId, Value>, AssayError>;
}
