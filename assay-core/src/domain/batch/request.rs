// assay-core/src/domain/batch/request.rs
//
// Request family: a permissive carrier used at serialization boundaries and
// two validated request shapes (declarative and runtime) joined in a sum type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

use super::data::{BatchDataHandle, safe_deep_copy};
use super::resolution::standardize_batch_request_display_ordering;
use crate::domain::error::DomainError;
use crate::domain::identity::{deep_filter_properties, digest_map, json_type_name};

pub const DATASOURCE_NAME: &str = "datasource_name";
pub const DATA_CONNECTOR_NAME: &str = "data_connector_name";
pub const DATA_ASSET_NAME: &str = "data_asset_name";
pub const DATA_CONNECTOR_QUERY: &str = "data_connector_query";
pub const LIMIT: &str = "limit";
pub const RUNTIME_PARAMETERS: &str = "runtime_parameters";
pub const BATCH_IDENTIFIERS: &str = "batch_identifiers";
pub const BATCH_SPEC_PASSTHROUGH: &str = "batch_spec_passthrough";

// ==========================================
// RUNTIME PARAMETERS
// ==========================================

/// Parameters of a runtime request: an in-memory payload, a query or a path.
///
/// The payload is held as a live handle; every other entry is plain JSON.
#[derive(Debug, Clone, Default)]
pub struct RuntimeParameters {
    batch_data: Option<BatchDataHandle>,
    params: Map<String, Value>,
}

impl RuntimeParameters {
    pub const BATCH_DATA: &'static str = "batch_data";
    pub const QUERY: &'static str = "query";
    pub const PATH: &'static str = "path";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_batch_data(data: BatchDataHandle) -> Self {
        Self::new().with_batch_data(data)
    }

    pub fn from_query(query: impl Into<String>) -> Self {
        let mut params = Self::new();
        params.insert(Self::QUERY, Value::String(query.into()));
        params
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        let mut params = Self::new();
        params.insert(Self::PATH, Value::String(path.into()));
        params
    }

    /// Builds parameters from JSON. A `batch_data` entry stays a plain JSON value.
    pub fn from_json_map(params: Map<String, Value>) -> Self {
        Self {
            batch_data: None,
            params,
        }
    }

    pub fn with_batch_data(mut self, data: BatchDataHandle) -> Self {
        self.batch_data = Some(data);
        self
    }

    pub fn set_batch_data(&mut self, data: BatchDataHandle) {
        self.batch_data = Some(data);
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.params.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn batch_data(&self) -> Option<&BatchDataHandle> {
        self.batch_data.as_ref()
    }

    pub fn query(&self) -> Option<&str> {
        self.params.get(Self::QUERY).and_then(Value::as_str)
    }

    pub fn path(&self) -> Option<&str> {
        self.params.get(Self::PATH).and_then(Value::as_str)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.params
    }

    pub fn contains_key(&self, key: &str) -> bool {
        (key == Self::BATCH_DATA && self.batch_data.is_some()) || self.params.contains_key(key)
    }

    /// True when an in-memory payload (live or already rendered) is present.
    pub fn contains_batch_data(&self) -> bool {
        self.batch_data.is_some()
            || self
                .params
                .get(Self::BATCH_DATA)
                .is_some_and(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.params.len() + usize::from(self.batch_data.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JSON view in which a live payload is replaced by its type name.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(data) = &self.batch_data {
            map.insert(
                Self::BATCH_DATA.to_string(),
                Value::String(data.type_name().to_string()),
            );
        }
        for (key, value) in &self.params {
            if key == Self::BATCH_DATA && self.batch_data.is_some() {
                continue;
            }
            map.insert(key.clone(), value.clone());
        }
        map
    }

    pub fn deep_copy(&self) -> Self {
        Self {
            batch_data: self.batch_data.as_ref().map(safe_deep_copy),
            params: self.params.clone(),
        }
    }

    pub(crate) fn filtered(mut self) -> Self {
        deep_filter_properties(&mut self.params);
        self
    }
}

// ==========================================
// BASE CARRIER
// ==========================================

/// Unvalidated bag of every request field, any of which may be absent.
///
/// Only reachable from the validated request types; it exists so pipeline
/// stages can serialize, compare and copy requests uniformly.
#[derive(Debug, Clone)]
pub struct BatchRequestBase {
    pub(crate) datasource_name: Option<String>,
    pub(crate) data_connector_name: Option<String>,
    pub(crate) data_asset_name: Option<String>,
    pub(crate) data_connector_query: Option<Map<String, Value>>,
    pub(crate) limit: Option<i64>,
    pub(crate) runtime_parameters: Option<RuntimeParameters>,
    pub(crate) batch_identifiers: Option<Map<String, Value>>,
    pub(crate) batch_spec_passthrough: Option<Map<String, Value>>,
}

impl BatchRequestBase {
    pub(crate) fn empty() -> Self {
        Self {
            datasource_name: None,
            data_connector_name: None,
            data_asset_name: None,
            data_connector_query: None,
            limit: None,
            runtime_parameters: None,
            batch_identifiers: None,
            batch_spec_passthrough: None,
        }
    }

    pub fn datasource_name(&self) -> Option<&str> {
        self.datasource_name.as_deref()
    }

    pub fn data_connector_name(&self) -> Option<&str> {
        self.data_connector_name.as_deref()
    }

    pub fn data_asset_name(&self) -> Option<&str> {
        self.data_asset_name.as_deref()
    }

    pub fn data_connector_query(&self) -> Option<&Map<String, Value>> {
        self.data_connector_query.as_ref()
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn runtime_parameters(&self) -> Option<&RuntimeParameters> {
        self.runtime_parameters.as_ref()
    }

    pub fn batch_identifiers(&self) -> Option<&Map<String, Value>> {
        self.batch_identifiers.as_ref()
    }

    pub fn batch_spec_passthrough(&self) -> Option<&Map<String, Value>> {
        self.batch_spec_passthrough.as_ref()
    }

    pub fn runtime_parameters_mut(&mut self) -> Option<&mut RuntimeParameters> {
        self.runtime_parameters.as_mut()
    }

    pub fn batch_identifiers_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.batch_identifiers.as_mut()
    }

    pub fn data_connector_query_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.data_connector_query.as_mut()
    }

    pub fn batch_spec_passthrough_mut(&mut self) -> &mut Map<String, Value> {
        self.batch_spec_passthrough.get_or_insert_with(Map::new)
    }

    /// Every field (absent ones as null) in display order.
    pub fn to_dict(&self) -> Map<String, Value> {
        self.to_dict_with(None)
    }

    pub(crate) fn to_dict_with(&self, include_field_names: Option<&[&str]>) -> Map<String, Value> {
        let fields: [(&str, Value); 8] = [
            (DATASOURCE_NAME, opt_string(&self.datasource_name)),
            (DATA_CONNECTOR_NAME, opt_string(&self.data_connector_name)),
            (DATA_ASSET_NAME, opt_string(&self.data_asset_name)),
            (DATA_CONNECTOR_QUERY, opt_map(&self.data_connector_query)),
            (LIMIT, self.limit.map(Value::from).unwrap_or(Value::Null)),
            (
                RUNTIME_PARAMETERS,
                self.runtime_parameters
                    .as_ref()
                    .map(|p| Value::Object(p.to_json_map()))
                    .unwrap_or(Value::Null),
            ),
            (BATCH_IDENTIFIERS, opt_map(&self.batch_identifiers)),
            (BATCH_SPEC_PASSTHROUGH, opt_map(&self.batch_spec_passthrough)),
        ];

        let dict: Map<String, Value> = fields
            .into_iter()
            .filter(|(name, _)| include_field_names.is_none_or(|names| names.contains(name)))
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        standardize_batch_request_display_ordering(dict)
    }

    /// Serializable snapshot. Built from a shadow view, so an in-memory
    /// payload is rendered by type name and the request itself is untouched.
    pub fn to_json_dict(&self) -> Map<String, Value> {
        self.to_dict()
    }

    pub fn id(&self) -> String {
        digest_map(&self.to_json_dict())
    }

    /// Structurally independent copy; payloads follow the safe deep copy rule.
    pub fn deep_copy(&self) -> Self {
        Self {
            runtime_parameters: self.runtime_parameters.as_ref().map(RuntimeParameters::deep_copy),
            ..self.clone()
        }
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn opt_map(value: &Option<Map<String, Value>>) -> Value {
    value.clone().map(Value::Object).unwrap_or(Value::Null)
}

fn filtered_json_text(mut dict: Map<String, Value>) -> Result<String, fmt::Error> {
    deep_filter_properties(&mut dict);
    serde_json::to_string_pretty(&Value::Object(dict)).map_err(|_| fmt::Error)
}

macro_rules! identity_by_id {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.id() == other.id()
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id().hash(state);
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", filtered_json_text(self.to_json_dict())?)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.to_json_dict().serialize(serializer)
            }
        }
    };
}

identity_by_id!(BatchRequestBase);
identity_by_id!(BatchRequest);
identity_by_id!(RuntimeBatchRequest);
identity_by_id!(TypedBatchRequest);

// ==========================================
// VALIDATION HELPERS
// ==========================================

fn validated_name(field: &str, value: Option<String>) -> Result<String, DomainError> {
    match value {
        Some(name) if !name.is_empty() => Ok(name),
        Some(_) => Err(DomainError::invalid_type(field, "a non-empty string", "empty string")),
        None => Err(DomainError::invalid_type(field, "a non-empty string", "null")),
    }
}

fn json_name(map: &Map<String, Value>, field: &str) -> Result<Option<String>, DomainError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DomainError::invalid_type(
            field,
            "a non-empty string",
            json_type_name(other),
        )),
    }
}

fn json_mapping(
    map: &Map<String, Value>,
    field: &str,
) -> Result<Option<Map<String, Value>>, DomainError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner.clone())),
        Some(other) => Err(DomainError::invalid_type(
            field,
            "a mapping",
            json_type_name(other),
        )),
    }
}

fn json_limit(map: &Map<String, Value>) -> Result<Option<i64>, DomainError> {
    match map.get(LIMIT) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) if n.is_u64() && n.as_i64().is_none() => {
            Err(DomainError::OutOfRange {
                field: LIMIT.to_string(),
                value: n.to_string(),
            })
        }
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| DomainError::invalid_type(LIMIT, "an integer", json_type_name(value))),
    }
}

fn reject_unknown_fields(
    map: &Map<String, Value>,
    allowed: &[&str],
    request_type: &'static str,
) -> Result<(), DomainError> {
    let unexpected = map
        .iter()
        .find(|(k, v)| !v.is_null() && !allowed.contains(&k.as_str()));
    match unexpected {
        Some((field, _)) => Err(DomainError::UnexpectedField {
            field: field.clone(),
            request_type,
        }),
        None => Ok(()),
    }
}

fn non_empty_mapping(
    field: &str,
    value: Option<Map<String, Value>>,
) -> Result<Map<String, Value>, DomainError> {
    match value {
        Some(map) if !map.is_empty() => Ok(map),
        _ => Err(DomainError::EmptyField {
            field: field.to_string(),
            expected: "mapping",
        }),
    }
}

// ==========================================
// DECLARATIVE REQUEST
// ==========================================

/// Request for batches of a known asset, optionally narrowed by a query.
///
/// `limit` counts batches, not rows.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    datasource_name: String,
    data_connector_name: String,
    data_asset_name: String,
    data_connector_query: Option<Map<String, Value>>,
    limit: Option<i64>,
    batch_spec_passthrough: Option<Map<String, Value>>,
}

impl BatchRequest {
    pub const INCLUDE_FIELD_NAMES: [&'static str; 6] = [
        DATASOURCE_NAME,
        DATA_CONNECTOR_NAME,
        DATA_ASSET_NAME,
        DATA_CONNECTOR_QUERY,
        LIMIT,
        BATCH_SPEC_PASSTHROUGH,
    ];

    pub fn new(
        datasource_name: impl Into<String>,
        data_connector_name: impl Into<String>,
        data_asset_name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            datasource_name: validated_name(DATASOURCE_NAME, Some(datasource_name.into()))?,
            data_connector_name: validated_name(
                DATA_CONNECTOR_NAME,
                Some(data_connector_name.into()),
            )?,
            data_asset_name: validated_name(DATA_ASSET_NAME, Some(data_asset_name.into()))?,
            data_connector_query: None,
            limit: None,
            batch_spec_passthrough: None,
        })
    }

    pub fn with_data_connector_query(mut self, query: Map<String, Value>) -> Self {
        self.data_connector_query = Some(query);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_batch_spec_passthrough(mut self, passthrough: Map<String, Value>) -> Self {
        self.batch_spec_passthrough = Some(passthrough);
        self
    }

    pub(crate) fn from_base(base: BatchRequestBase) -> Result<Self, DomainError> {
        if base.runtime_parameters.is_some() {
            return Err(DomainError::UnexpectedField {
                field: RUNTIME_PARAMETERS.into(),
                request_type: "BatchRequest",
            });
        }
        if base.batch_identifiers.is_some() {
            return Err(DomainError::UnexpectedField {
                field: BATCH_IDENTIFIERS.into(),
                request_type: "BatchRequest",
            });
        }

        Ok(Self {
            datasource_name: validated_name(DATASOURCE_NAME, base.datasource_name)?,
            data_connector_name: validated_name(DATA_CONNECTOR_NAME, base.data_connector_name)?,
            data_asset_name: validated_name(DATA_ASSET_NAME, base.data_asset_name)?,
            data_connector_query: base.data_connector_query,
            limit: base.limit,
            batch_spec_passthrough: base.batch_spec_passthrough,
        })
    }

    /// Builds a request from a loose mapping, checking each field's type.
    ///
    /// Null entries outside the allow-list are tolerated; anything else is rejected.
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self, DomainError> {
        reject_unknown_fields(map, &Self::INCLUDE_FIELD_NAMES, "BatchRequest")?;
        Ok(Self {
            datasource_name: validated_name(DATASOURCE_NAME, json_name(map, DATASOURCE_NAME)?)?,
            data_connector_name: validated_name(
                DATA_CONNECTOR_NAME,
                json_name(map, DATA_CONNECTOR_NAME)?,
            )?,
            data_asset_name: validated_name(DATA_ASSET_NAME, json_name(map, DATA_ASSET_NAME)?)?,
            data_connector_query: json_mapping(map, DATA_CONNECTOR_QUERY)?,
            limit: json_limit(map)?,
            batch_spec_passthrough: json_mapping(map, BATCH_SPEC_PASSTHROUGH)?,
        })
    }

    pub fn datasource_name(&self) -> &str {
        &self.datasource_name
    }

    pub fn data_connector_name(&self) -> &str {
        &self.data_connector_name
    }

    pub fn data_asset_name(&self) -> &str {
        &self.data_asset_name
    }

    pub fn data_connector_query(&self) -> Option<&Map<String, Value>> {
        self.data_connector_query.as_ref()
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn batch_spec_passthrough(&self) -> Option<&Map<String, Value>> {
        self.batch_spec_passthrough.as_ref()
    }

    pub fn to_base(&self) -> BatchRequestBase {
        BatchRequestBase {
            datasource_name: Some(self.datasource_name.clone()),
            data_connector_name: Some(self.data_connector_name.clone()),
            data_asset_name: Some(self.data_asset_name.clone()),
            data_connector_query: self.data_connector_query.clone(),
            limit: self.limit,
            batch_spec_passthrough: self.batch_spec_passthrough.clone(),
            ..BatchRequestBase::empty()
        }
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        self.to_base().to_dict_with(Some(&Self::INCLUDE_FIELD_NAMES))
    }

    pub fn to_json_dict(&self) -> Map<String, Value> {
        self.to_dict()
    }

    pub fn id(&self) -> String {
        digest_map(&self.to_json_dict())
    }
}

// ==========================================
// RUNTIME REQUEST
// ==========================================

/// Request whose data is supplied by the caller (payload, query or path),
/// tagged with identifiers standing in for what a connector would discover.
#[derive(Debug, Clone)]
pub struct RuntimeBatchRequest {
    datasource_name: String,
    data_connector_name: String,
    data_asset_name: String,
    runtime_parameters: RuntimeParameters,
    batch_identifiers: Map<String, Value>,
    batch_spec_passthrough: Option<Map<String, Value>>,
}

impl RuntimeBatchRequest {
    pub const INCLUDE_FIELD_NAMES: [&'static str; 6] = [
        DATASOURCE_NAME,
        DATA_CONNECTOR_NAME,
        DATA_ASSET_NAME,
        RUNTIME_PARAMETERS,
        BATCH_IDENTIFIERS,
        BATCH_SPEC_PASSTHROUGH,
    ];

    pub fn new(
        datasource_name: impl Into<String>,
        data_connector_name: impl Into<String>,
        data_asset_name: impl Into<String>,
        runtime_parameters: RuntimeParameters,
        batch_identifiers: Map<String, Value>,
    ) -> Result<Self, DomainError> {
        let mut base = BatchRequestBase::empty();
        base.datasource_name = Some(datasource_name.into());
        base.data_connector_name = Some(data_connector_name.into());
        base.data_asset_name = Some(data_asset_name.into());
        base.runtime_parameters = Some(runtime_parameters);
        base.batch_identifiers = Some(batch_identifiers);
        Self::from_base(base)
    }

    pub fn with_batch_spec_passthrough(mut self, passthrough: Map<String, Value>) -> Self {
        self.batch_spec_passthrough = Some(passthrough);
        self
    }

    pub(crate) fn from_base(base: BatchRequestBase) -> Result<Self, DomainError> {
        if base.data_connector_query.is_some() {
            return Err(DomainError::UnexpectedField {
                field: DATA_CONNECTOR_QUERY.into(),
                request_type: "RuntimeBatchRequest",
            });
        }
        if base.limit.is_some() {
            return Err(DomainError::UnexpectedField {
                field: LIMIT.into(),
                request_type: "RuntimeBatchRequest",
            });
        }

        let datasource_name = validated_name(DATASOURCE_NAME, base.datasource_name)?;
        let data_connector_name = validated_name(DATA_CONNECTOR_NAME, base.data_connector_name)?;
        let data_asset_name = validated_name(DATA_ASSET_NAME, base.data_asset_name)?;

        let runtime_parameters = match base.runtime_parameters {
            Some(params) if !params.is_empty() => params,
            _ => {
                return Err(DomainError::EmptyField {
                    field: RUNTIME_PARAMETERS.into(),
                    expected: "mapping",
                });
            }
        };
        let batch_identifiers = non_empty_mapping(BATCH_IDENTIFIERS, base.batch_identifiers)?;

        Ok(Self {
            datasource_name,
            data_connector_name,
            data_asset_name,
            runtime_parameters,
            batch_identifiers,
            batch_spec_passthrough: base.batch_spec_passthrough,
        })
    }

    /// Builds a request from a loose mapping, checking each field's type.
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self, DomainError> {
        reject_unknown_fields(map, &Self::INCLUDE_FIELD_NAMES, "RuntimeBatchRequest")?;

        let mut base = BatchRequestBase::empty();
        base.datasource_name = json_name(map, DATASOURCE_NAME)?;
        base.data_connector_name = json_name(map, DATA_CONNECTOR_NAME)?;
        base.data_asset_name = json_name(map, DATA_ASSET_NAME)?;
        base.runtime_parameters =
            json_mapping(map, RUNTIME_PARAMETERS)?.map(RuntimeParameters::from_json_map);
        base.batch_identifiers = json_mapping(map, BATCH_IDENTIFIERS)?;
        base.batch_spec_passthrough = json_mapping(map, BATCH_SPEC_PASSTHROUGH)?;
        Self::from_base(base)
    }

    pub fn datasource_name(&self) -> &str {
        &self.datasource_name
    }

    pub fn data_connector_name(&self) -> &str {
        &self.data_connector_name
    }

    pub fn data_asset_name(&self) -> &str {
        &self.data_asset_name
    }

    pub fn runtime_parameters(&self) -> &RuntimeParameters {
        &self.runtime_parameters
    }

    pub fn batch_identifiers(&self) -> &Map<String, Value> {
        &self.batch_identifiers
    }

    pub fn batch_spec_passthrough(&self) -> Option<&Map<String, Value>> {
        self.batch_spec_passthrough.as_ref()
    }

    pub fn to_base(&self) -> BatchRequestBase {
        BatchRequestBase {
            datasource_name: Some(self.datasource_name.clone()),
            data_connector_name: Some(self.data_connector_name.clone()),
            data_asset_name: Some(self.data_asset_name.clone()),
            runtime_parameters: Some(self.runtime_parameters.clone()),
            batch_identifiers: Some(self.batch_identifiers.clone()),
            batch_spec_passthrough: self.batch_spec_passthrough.clone(),
            ..BatchRequestBase::empty()
        }
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        self.to_base().to_dict_with(Some(&Self::INCLUDE_FIELD_NAMES))
    }

    pub fn to_json_dict(&self) -> Map<String, Value> {
        self.to_dict()
    }

    pub fn id(&self) -> String {
        digest_map(&self.to_json_dict())
    }

    pub fn deep_copy(&self) -> Self {
        Self {
            runtime_parameters: self.runtime_parameters.deep_copy(),
            ..self.clone()
        }
    }
}

// ==========================================
// SUM TYPE
// ==========================================

/// A validated request of either shape.
#[derive(Debug, Clone)]
pub enum TypedBatchRequest {
    Declarative(BatchRequest),
    Runtime(RuntimeBatchRequest),
}

impl TypedBatchRequest {
    /// Picks the runtime shape when `runtime_parameters` is present, else the declarative one.
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self, DomainError> {
        let has_runtime = map.get(RUNTIME_PARAMETERS).is_some_and(|v| !v.is_null());
        if has_runtime {
            RuntimeBatchRequest::from_json_map(map).map(Self::Runtime)
        } else {
            BatchRequest::from_json_map(map).map(Self::Declarative)
        }
    }

    pub(crate) fn from_base(base: BatchRequestBase) -> Result<Self, DomainError> {
        if base.runtime_parameters.is_some() {
            RuntimeBatchRequest::from_base(base).map(Self::Runtime)
        } else {
            BatchRequest::from_base(base).map(Self::Declarative)
        }
    }

    pub fn datasource_name(&self) -> &str {
        match self {
            Self::Declarative(r) => r.datasource_name(),
            Self::Runtime(r) => r.datasource_name(),
        }
    }

    pub fn data_connector_name(&self) -> &str {
        match self {
            Self::Declarative(r) => r.data_connector_name(),
            Self::Runtime(r) => r.data_connector_name(),
        }
    }

    pub fn data_asset_name(&self) -> &str {
        match self {
            Self::Declarative(r) => r.data_asset_name(),
            Self::Runtime(r) => r.data_asset_name(),
        }
    }

    pub fn batch_spec_passthrough(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Declarative(r) => r.batch_spec_passthrough(),
            Self::Runtime(r) => r.batch_spec_passthrough(),
        }
    }

    pub fn runtime_parameters(&self) -> Option<&RuntimeParameters> {
        match self {
            Self::Declarative(_) => None,
            Self::Runtime(r) => Some(r.runtime_parameters()),
        }
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }

    pub fn to_base(&self) -> BatchRequestBase {
        match self {
            Self::Declarative(r) => r.to_base(),
            Self::Runtime(r) => r.to_base(),
        }
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        match self {
            Self::Declarative(r) => r.to_dict(),
            Self::Runtime(r) => r.to_dict(),
        }
    }

    pub fn to_json_dict(&self) -> Map<String, Value> {
        self.to_dict()
    }

    pub fn id(&self) -> String {
        digest_map(&self.to_json_dict())
    }

    pub fn deep_copy(&self) -> Self {
        match self {
            Self::Declarative(r) => Self::Declarative(r.clone()),
            Self::Runtime(r) => Self::Runtime(r.deep_copy()),
        }
    }
}

impl From<BatchRequest> for TypedBatchRequest {
    fn from(request: BatchRequest) -> Self {
        Self::Declarative(request)
    }
}

impl From<RuntimeBatchRequest> for TypedBatchRequest {
    fn from(request: RuntimeBatchRequest) -> Self {
        Self::Runtime(request)
    }
}

impl<'de> Deserialize<'de> for TypedBatchRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_json_map(&map).map_err(serde::de::Error::custom)
    }
}
