// assay-core/src/domain/batch/resolution.rs
//
// Normalization layer: turns loose caller input into one of the two typed
// request shapes.

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::data::BatchDataHandle;
use super::request::{
    BATCH_IDENTIFIERS, BatchRequest, BatchRequestBase, DATA_ASSET_NAME, DATA_CONNECTOR_NAME,
    DATASOURCE_NAME, RUNTIME_PARAMETERS, RuntimeBatchRequest, RuntimeParameters,
    TypedBatchRequest,
};
use crate::domain::error::DomainError;
use crate::domain::identity::json::filtered_or_none;

/// Anything a batch request can be described by: a loose JSON mapping or a request object.
#[derive(Debug, Clone, Copy)]
pub enum BatchRequestRef<'a> {
    Map(&'a Map<String, Value>),
    Request(&'a BatchRequestBase),
    Typed(&'a TypedBatchRequest),
}

impl<'a> From<&'a Map<String, Value>> for BatchRequestRef<'a> {
    fn from(map: &'a Map<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl<'a> From<&'a BatchRequestBase> for BatchRequestRef<'a> {
    fn from(base: &'a BatchRequestBase) -> Self {
        Self::Request(base)
    }
}

impl<'a> From<&'a TypedBatchRequest> for BatchRequestRef<'a> {
    fn from(request: &'a TypedBatchRequest) -> Self {
        Self::Typed(request)
    }
}

/// True when the request carries a non-null `runtime_parameters` entry.
pub fn batch_request_contains_runtime_parameters(batch_request: Option<BatchRequestRef<'_>>) -> bool {
    match batch_request {
        None => false,
        Some(BatchRequestRef::Map(map)) => {
            map.get(RUNTIME_PARAMETERS).is_some_and(|v| !v.is_null())
        }
        Some(BatchRequestRef::Request(base)) => base.runtime_parameters().is_some(),
        Some(BatchRequestRef::Typed(request)) => request.runtime_parameters().is_some(),
    }
}

/// True when the runtime parameters embed an in-memory payload (as opposed to a query or path).
pub fn batch_request_contains_batch_data(batch_request: Option<BatchRequestRef<'_>>) -> bool {
    if !batch_request_contains_runtime_parameters(batch_request) {
        return false;
    }
    match batch_request {
        Some(BatchRequestRef::Map(map)) => map
            .get(RUNTIME_PARAMETERS)
            .and_then(|params| params.get(RuntimeParameters::BATCH_DATA))
            .is_some_and(|v| !v.is_null()),
        Some(BatchRequestRef::Request(base)) => base
            .runtime_parameters()
            .is_some_and(RuntimeParameters::contains_batch_data),
        Some(BatchRequestRef::Typed(request)) => request
            .runtime_parameters()
            .is_some_and(RuntimeParameters::contains_batch_data),
        None => false,
    }
}

/// Mappings pass through; request objects are rendered with `to_dict()`.
pub fn get_batch_request_as_dict(
    batch_request: Option<BatchRequestRef<'_>>,
) -> Option<Map<String, Value>> {
    match batch_request? {
        BatchRequestRef::Map(map) => Some(map.clone()),
        BatchRequestRef::Request(base) => Some(base.to_dict()),
        BatchRequestRef::Typed(request) => Some(request.to_dict()),
    }
}

/// Turns loose input into a typed request, or `None` when there is nothing to materialize.
///
/// The runtime shape is chosen whenever runtime parameters are present. Request
/// objects keep their live payload handles; mappings are type checked field by field.
pub fn materialize_batch_request(
    batch_request: Option<BatchRequestRef<'_>>,
) -> Result<Option<TypedBatchRequest>, DomainError> {
    match batch_request {
        None => Ok(None),
        Some(BatchRequestRef::Map(map)) => {
            if map.is_empty() {
                return Ok(None);
            }
            TypedBatchRequest::from_json_map(map).map(Some)
        }
        Some(BatchRequestRef::Request(base)) => {
            if get_batch_request_as_dict(batch_request)
                .is_none_or(|dict| dict.values().all(Value::is_null))
            {
                return Ok(None);
            }
            TypedBatchRequest::from_base(base.clone()).map(Some)
        }
        Some(BatchRequestRef::Typed(request)) => Ok(Some(request.clone())),
    }
}

/// Reorders a request mapping: identity fields first, then `runtime_parameters`
/// and `batch_identifiers` when set, then everything else in original order.
///
/// Missing identity fields are emitted as null so the first three keys are stable.
pub fn standardize_batch_request_display_ordering(
    mut batch_request: Map<String, Value>,
) -> Map<String, Value> {
    let mut ordered = Map::new();
    for key in [DATASOURCE_NAME, DATA_CONNECTOR_NAME, DATA_ASSET_NAME] {
        let value = batch_request.remove(key).unwrap_or(Value::Null);
        ordered.insert(key.to_string(), value);
    }

    for key in [RUNTIME_PARAMETERS, BATCH_IDENTIFIERS] {
        if batch_request.get(key).is_some_and(|v| !v.is_null()) {
            if let Some(value) = batch_request.remove(key) {
                ordered.insert(key.to_string(), value);
            }
        }
    }

    ordered.extend(batch_request);
    ordered
}

// ==========================================
// ARGUMENT NORMALIZATION
// ==========================================

/// Everything a caller may say about the batch it wants, in option groups.
///
/// Runtime group: `batch_data`, `query`, `path`, `runtime_parameters`,
/// `batch_identifiers`. Declarative group: `data_connector_query`,
/// `batch_filter_parameters`, `limit`, `index`, `custom_filter_function`.
/// Fetch group: `batch_spec_passthrough` or the sampling/splitter pairs.
#[derive(Debug, Clone, Default)]
pub struct BatchRequestArguments {
    pub datasource_name: Option<String>,
    pub data_connector_name: Option<String>,
    pub data_asset_name: Option<String>,

    pub batch_request: Option<TypedBatchRequest>,

    pub batch_data: Option<BatchDataHandle>,
    pub query: Option<String>,
    pub path: Option<String>,
    pub runtime_parameters: Option<RuntimeParameters>,
    pub batch_identifiers: Option<Map<String, Value>>,

    pub data_connector_query: Option<Map<String, Value>>,
    pub batch_filter_parameters: Option<Map<String, Value>>,
    pub limit: Option<i64>,
    pub index: Option<Value>,
    /// Name of a filter registered on the data connector.
    pub custom_filter_function: Option<String>,

    pub batch_spec_passthrough: Option<Map<String, Value>>,
    pub sampling_method: Option<String>,
    pub sampling_kwargs: Option<Map<String, Value>>,
    pub splitter_method: Option<String>,
    pub splitter_kwargs: Option<Map<String, Value>>,

    /// Compatibility only: identifier values given without naming their role.
    /// Used as `batch_identifiers` (runtime) or `batch_filter_parameters`
    /// (declarative) when neither is given explicitly.
    pub extra_identifiers: Map<String, Value>,
}

impl BatchRequestArguments {
    pub fn new(
        datasource_name: impl Into<String>,
        data_connector_name: impl Into<String>,
        data_asset_name: impl Into<String>,
    ) -> Self {
        Self {
            datasource_name: Some(datasource_name.into()),
            data_connector_name: Some(data_connector_name.into()),
            data_asset_name: Some(data_asset_name.into()),
            ..Self::default()
        }
    }

    pub fn from_request(batch_request: TypedBatchRequest) -> Self {
        Self {
            batch_request: Some(batch_request),
            ..Self::default()
        }
    }

    pub fn with_batch_data(mut self, data: BatchDataHandle) -> Self {
        self.batch_data = Some(data);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_runtime_parameters(mut self, params: RuntimeParameters) -> Self {
        self.runtime_parameters = Some(params);
        self
    }

    pub fn with_batch_identifiers(mut self, ids: Map<String, Value>) -> Self {
        self.batch_identifiers = Some(ids);
        self
    }

    pub fn with_data_connector_query(mut self, query: Map<String, Value>) -> Self {
        self.data_connector_query = Some(query);
        self
    }

    pub fn with_batch_filter_parameters(mut self, params: Map<String, Value>) -> Self {
        self.batch_filter_parameters = Some(params);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_index(mut self, index: impl Into<Value>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_custom_filter_function(mut self, name: impl Into<String>) -> Self {
        self.custom_filter_function = Some(name.into());
        self
    }

    pub fn with_batch_spec_passthrough(mut self, passthrough: Map<String, Value>) -> Self {
        self.batch_spec_passthrough = Some(passthrough);
        self
    }

    pub fn with_sampling(mut self, method: impl Into<String>, kwargs: Option<Map<String, Value>>) -> Self {
        self.sampling_method = Some(method.into());
        self.sampling_kwargs = kwargs;
        self
    }

    pub fn with_splitter(mut self, method: impl Into<String>, kwargs: Option<Map<String, Value>>) -> Self {
        self.splitter_method = Some(method.into());
        self.splitter_kwargs = kwargs;
        self
    }

    pub fn with_extra_identifier(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_identifiers.insert(key.into(), value.into());
        self
    }

    fn has_runtime_signal(&self) -> bool {
        self.batch_data.is_some()
            || self.query.as_deref().is_some_and(|q| !q.is_empty())
            || self.path.as_deref().is_some_and(|p| !p.is_empty())
            || self.runtime_parameters.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// Central entry point: validates the argument combination and builds the typed request.
///
/// A pre-built request wins over every loose argument. Otherwise any runtime
/// signal selects the runtime shape; the declarative shape is the fallback.
#[instrument(skip(arguments), fields(datasource = ?arguments.datasource_name))]
pub fn get_batch_request_from_acceptable_arguments(
    mut arguments: BatchRequestArguments,
) -> Result<TypedBatchRequest, DomainError> {
    if let Some(request) = &arguments.batch_request {
        arguments.datasource_name = Some(request.datasource_name().to_string());
    }

    if arguments.datasource_name.is_none() {
        return Err(DomainError::invalid_type(
            "datasource_name",
            "a string",
            "null",
        ));
    }

    let payload_count = [
        arguments.batch_data.is_some(),
        arguments.query.is_some(),
        arguments.path.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count();
    if payload_count > 1 {
        return Err(DomainError::ConflictingArguments(
            "Must provide only one of batch_data, query, or path.".into(),
        ));
    }

    if let Some(params) = &arguments.runtime_parameters {
        let duplicated = (arguments.batch_data.is_some()
            && params.contains_key(RuntimeParameters::BATCH_DATA))
            || (arguments.query.is_some() && params.contains_key(RuntimeParameters::QUERY))
            || (arguments.path.is_some() && params.contains_key(RuntimeParameters::PATH));
        if duplicated {
            return Err(DomainError::ConflictingArguments(
                "If batch_data, query, or path arguments are provided, the same keys cannot appear in the runtime_parameters argument.".into(),
            ));
        }
    }

    if let Some(request) = arguments.batch_request {
        debug!("Using pre-built batch request as-is");
        return Ok(request);
    }

    if arguments.has_runtime_signal() {
        build_runtime_request(arguments).map(TypedBatchRequest::Runtime)
    } else {
        build_declarative_request(arguments).map(TypedBatchRequest::Declarative)
    }
}

fn build_runtime_request(arguments: BatchRequestArguments) -> Result<RuntimeBatchRequest, DomainError> {
    let mut runtime_parameters = arguments.runtime_parameters.unwrap_or_default();
    if let Some(data) = arguments.batch_data {
        runtime_parameters.set_batch_data(data);
    } else if let Some(query) = arguments.query {
        runtime_parameters.insert(RuntimeParameters::QUERY, Value::String(query));
    } else if let Some(path) = arguments.path {
        runtime_parameters.insert(RuntimeParameters::PATH, Value::String(path));
    }

    let batch_identifiers = match arguments.batch_identifiers {
        Some(ids) => ids,
        None => {
            if !arguments.extra_identifiers.is_empty() {
                debug!("Using extra identifiers as runtime batch_identifiers");
            }
            arguments.extra_identifiers
        }
    };

    let mut base = BatchRequestBase::empty();
    base.datasource_name = arguments.datasource_name;
    base.data_connector_name = arguments.data_connector_name;
    base.data_asset_name = arguments.data_asset_name;
    base.runtime_parameters = Some(runtime_parameters.filtered());
    base.batch_identifiers = filtered_or_none(Some(batch_identifiers));
    base.batch_spec_passthrough = filtered_or_none(arguments.batch_spec_passthrough);

    RuntimeBatchRequest::from_base(base)
}

fn build_declarative_request(arguments: BatchRequestArguments) -> Result<BatchRequest, DomainError> {
    let data_connector_query = match arguments.data_connector_query {
        Some(query) => query,
        None => {
            let batch_filter_parameters =
                match (arguments.batch_filter_parameters, arguments.batch_identifiers) {
                    (Some(_), Some(_)) => {
                        return Err(DomainError::ConflictingArguments(
                            "Must provide either \"batch_filter_parameters\" or \"batch_identifiers\", not both.".into(),
                        ));
                    }
                    (Some(params), None) => params,
                    (None, Some(ids)) => {
                        warn!(
                            "Attempting to build data_connector_query but \"batch_identifiers\" was provided instead of \"batch_filter_parameters\". The \"batch_identifiers\" key on data_connector_query has been renamed to \"batch_filter_parameters\". Please update your code. Falling back on provided \"batch_identifiers\"."
                        );
                        ids
                    }
                    (None, None) => arguments.extra_identifiers,
                };

            let mut query = Map::new();
            query.insert(
                "batch_filter_parameters".into(),
                Value::Object(batch_filter_parameters),
            );
            query.insert(
                "limit".into(),
                arguments.limit.map(Value::from).unwrap_or(Value::Null),
            );
            query.insert("index".into(), arguments.index.unwrap_or(Value::Null));
            query.insert(
                "custom_filter_function".into(),
                arguments
                    .custom_filter_function
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            query
        }
    };

    let batch_spec_passthrough = match arguments.batch_spec_passthrough {
        Some(passthrough) => passthrough,
        None => {
            let mut passthrough = Map::new();
            if let Some(method) = arguments.sampling_method {
                passthrough.insert("sampling_method".into(), Value::String(method));
                if let Some(kwargs) = arguments.sampling_kwargs {
                    passthrough.insert("sampling_kwargs".into(), Value::Object(kwargs));
                }
            }
            if let Some(method) = arguments.splitter_method {
                passthrough.insert("splitter_method".into(), Value::String(method));
                if let Some(kwargs) = arguments.splitter_kwargs {
                    passthrough.insert("splitter_kwargs".into(), Value::Object(kwargs));
                }
            }
            passthrough
        }
    };

    let mut base = BatchRequestBase::empty();
    base.datasource_name = arguments.datasource_name;
    base.data_connector_name = arguments.data_connector_name;
    base.data_asset_name = arguments.data_asset_name;
    base.data_connector_query = filtered_or_none(Some(data_connector_query));
    base.batch_spec_passthrough = filtered_or_none(Some(batch_spec_passthrough));

    BatchRequest::from_base(base)
}
