// assay-core/src/domain/batch/materialized.rs

use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, instrument};

use super::data::BatchDataHandle;
use super::definition::BatchDefinition;
use super::markers::BatchMarkers;
use super::request::TypedBatchRequest;
use super::spec::BatchSpec;
use crate::domain::error::DomainError;
use crate::domain::identity::{Fingerprint, IdDict, deep_filter_properties};
use crate::error::AssayError;
use crate::ports::{ExecutionEngine, MetricConfiguration};

/// What a batch is identified by: a full definition, or a bare identifier
/// mapping when the caller never had one.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchIdentity {
    Definition(BatchDefinition),
    Identifiers(IdDict),
}

impl Default for BatchIdentity {
    fn default() -> Self {
        Self::Identifiers(IdDict::new())
    }
}

impl Fingerprint for BatchIdentity {
    fn fingerprint(&self) -> Option<String> {
        match self {
            Self::Definition(definition) => definition.fingerprint(),
            Self::Identifiers(ids) => ids.fingerprint(),
        }
    }
}

impl From<BatchDefinition> for BatchIdentity {
    fn from(definition: BatchDefinition) -> Self {
        Self::Definition(definition)
    }
}

impl From<IdDict> for BatchIdentity {
    fn from(ids: IdDict) -> Self {
        Self::Identifiers(ids)
    }
}

/// One materialized slice of data, with everything needed to say where it came from.
#[derive(Debug, Clone)]
pub struct Batch {
    data: BatchDataHandle,
    batch_request: Option<TypedBatchRequest>,
    batch_definition: BatchIdentity,
    batch_spec: BatchSpec,
    batch_markers: BatchMarkers,
}

impl Batch {
    pub fn new(data: BatchDataHandle) -> Self {
        Self {
            data,
            batch_request: None,
            batch_definition: BatchIdentity::default(),
            batch_spec: BatchSpec::default(),
            batch_markers: BatchMarkers::stamped(),
        }
    }

    pub fn with_batch_request(mut self, batch_request: TypedBatchRequest) -> Self {
        self.batch_request = Some(batch_request);
        self
    }

    pub fn with_batch_definition(mut self, batch_definition: impl Into<BatchIdentity>) -> Self {
        self.batch_definition = batch_definition.into();
        self
    }

    pub fn with_batch_spec(mut self, batch_spec: BatchSpec) -> Self {
        self.batch_spec = batch_spec;
        self
    }

    pub fn with_batch_markers(mut self, batch_markers: BatchMarkers) -> Self {
        self.batch_markers = batch_markers;
        self
    }

    pub fn data(&self) -> &BatchDataHandle {
        &self.data
    }

    pub fn batch_request(&self) -> Option<&TypedBatchRequest> {
        self.batch_request.as_ref()
    }

    pub fn batch_definition(&self) -> &BatchIdentity {
        &self.batch_definition
    }

    pub fn batch_spec(&self) -> &BatchSpec {
        &self.batch_spec
    }

    pub fn batch_markers(&self) -> &BatchMarkers {
        &self.batch_markers
    }

    // Late binding during datasource resolution only.
    pub fn set_batch_request(&mut self, batch_request: Option<TypedBatchRequest>) {
        self.batch_request = batch_request;
    }

    pub fn set_batch_definition(&mut self, batch_definition: impl Into<BatchIdentity>) {
        self.batch_definition = batch_definition.into();
    }

    pub fn id(&self) -> Option<String> {
        self.batch_definition.fingerprint()
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        let batch_request = self
            .batch_request
            .as_ref()
            .map(TypedBatchRequest::to_dict)
            .unwrap_or_default();
        let batch_definition = match &self.batch_definition {
            BatchIdentity::Definition(definition) => definition.to_json_dict(),
            BatchIdentity::Identifiers(_) => Map::new(),
        };

        let mut dict = Map::new();
        dict.insert(
            "data".into(),
            Value::String(self.data.type_name().to_string()),
        );
        dict.insert("batch_request".into(), Value::Object(batch_request));
        dict.insert("batch_definition".into(), Value::Object(batch_definition));
        dict.insert("batch_spec".into(), Value::Object(self.batch_spec.to_json_map()));
        dict.insert(
            "batch_markers".into(),
            Value::Object(self.batch_markers.to_json_dict()),
        );
        dict
    }

    /// Like `to_dict`, with null and empty entries stripped from the request.
    pub fn to_json_dict(&self) -> Map<String, Value> {
        let mut dict = self.to_dict();
        if let Some(Value::Object(request)) = dict.get_mut("batch_request") {
            deep_filter_properties(request);
        }
        dict
    }

    /// First rows of this batch, computed by the engine that loaded it.
    #[instrument(skip(self, engine), fields(engine = engine.engine_name()))]
    pub fn head(
        &self,
        engine: &dyn ExecutionEngine,
        n_rows: usize,
        fetch_all: bool,
    ) -> Result<Value, AssayError> {
        let batch_id = self.id().ok_or_else(|| {
            DomainError::InvalidBatchId("batch has no identity to compute metrics on".into())
        })?;

        let metric = MetricConfiguration::new(
            MetricConfiguration::TABLE_HEAD,
            IdDict::new().with("batch_id", batch_id),
            IdDict::new().with("n_rows", n_rows).with("fetch_all", fetch_all),
        );
        debug!(metric = %metric, "Resolving head");

        let metric_id = metric.id();
        let mut resolved = engine.resolve_metrics(std::slice::from_ref(&metric))?;
        resolved
            .remove(&metric_id)
            .ok_or_else(|| DomainError::MetricNotResolved(metric.to_string()).into())
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(&Value::Object(self.to_json_dict()))
            .map_err(|_| fmt::Error)?;
        write!(f, "{}", text)
    }
}
