// assay-core/src/domain/batch/definition.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::error::DomainError;
use crate::domain::identity::{Fingerprint, IdDict, digest_map, json_type_name};

/// Canonical description of one batch a data connector can produce.
///
/// Identity covers the datasource, connector, asset and identifiers. The
/// passthrough travels with the definition but never changes its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct BatchDefinition {
    datasource_name: String,
    data_connector_name: String,
    data_asset_name: String,
    batch_identifiers: IdDict,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_spec_passthrough: Option<Map<String, Value>>,
}

impl BatchDefinition {
    pub fn new(
        datasource_name: impl Into<String>,
        data_connector_name: impl Into<String>,
        data_asset_name: impl Into<String>,
        batch_identifiers: IdDict,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            datasource_name: required_name("datasource_name", datasource_name.into())?,
            data_connector_name: required_name("data_connector_name", data_connector_name.into())?,
            data_asset_name: required_name("data_asset_name", data_asset_name.into())?,
            batch_identifiers,
            batch_spec_passthrough: None,
        })
    }

    /// Builds a definition from a loose JSON mapping, checking every field's type.
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self, DomainError> {
        let batch_identifiers = match map.get("batch_identifiers") {
            None | Some(Value::Null) => IdDict::new(),
            Some(Value::Object(ids)) => IdDict::from(ids.clone()),
            Some(other) => {
                return Err(DomainError::invalid_type(
                    "batch_identifiers",
                    "an IdDict object",
                    json_type_name(other),
                ));
            }
        };

        let batch_spec_passthrough = match map.get("batch_spec_passthrough") {
            None | Some(Value::Null) => None,
            Some(Value::Object(p)) => Some(p.clone()),
            Some(other) => {
                return Err(DomainError::invalid_type(
                    "batch_spec_passthrough",
                    "a mapping",
                    json_type_name(other),
                ));
            }
        };

        let mut definition = Self::new(
            name_field(map, "datasource_name")?,
            name_field(map, "data_connector_name")?,
            name_field(map, "data_asset_name")?,
            batch_identifiers,
        )?;
        definition.batch_spec_passthrough = batch_spec_passthrough;
        Ok(definition)
    }

    pub fn with_batch_spec_passthrough(mut self, passthrough: Map<String, Value>) -> Self {
        self.batch_spec_passthrough = Some(passthrough);
        self
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

    pub fn batch_identifiers(&self) -> &IdDict {
        &self.batch_identifiers
    }

    pub fn batch_spec_passthrough(&self) -> Option<&Map<String, Value>> {
        self.batch_spec_passthrough.as_ref()
    }

    pub fn set_batch_spec_passthrough(&mut self, passthrough: Option<Map<String, Value>>) {
        self.batch_spec_passthrough = passthrough;
    }

    /// The four identity fields as plain JSON.
    pub fn to_json_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert("datasource_name".into(), self.datasource_name.clone().into());
        dict.insert(
            "data_connector_name".into(),
            self.data_connector_name.clone().into(),
        );
        dict.insert("data_asset_name".into(), self.data_asset_name.clone().into());
        dict.insert(
            "batch_identifiers".into(),
            self.batch_identifiers.clone().into(),
        );
        dict
    }

    pub fn id(&self) -> String {
        digest_map(&self.to_json_dict())
    }
}

fn required_name(field: &str, value: String) -> Result<String, DomainError> {
    if value.is_empty() {
        return Err(DomainError::MissingField(field.to_string()));
    }
    Ok(value)
}

fn name_field(map: &Map<String, Value>, field: &str) -> Result<String, DomainError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(DomainError::MissingField(field.to_string())),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(DomainError::invalid_type(
            field,
            "a string",
            json_type_name(other),
        )),
    }
}

impl TryFrom<Map<String, Value>> for BatchDefinition {
    type Error = DomainError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_json_map(&map)
    }
}

impl Fingerprint for BatchDefinition {
    fn fingerprint(&self) -> Option<String> {
        Some(self.id())
    }
}

impl PartialEq for BatchDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for BatchDefinition {}

impl Hash for BatchDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for BatchDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(&Value::Object(self.to_json_dict()))
            .map_err(|_| fmt::Error)?;
        write!(f, "{}", text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn ids() -> IdDict {
        IdDict::new().with("year", "2024").with("month", "01")
    }

    #[test]
    fn test_id_is_deterministic() {
        let a = BatchDefinition::new("ds", "dc", "taxi", ids()).unwrap();
        let b = BatchDefinition::new("ds", "dc", "taxi", ids()).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn test_passthrough_does_not_change_identity() {
        let plain = BatchDefinition::new("ds", "dc", "taxi", ids()).unwrap();
        let passthrough = json!({"reader_method": "read_csv"}).as_object().cloned().unwrap();
        let with_passthrough = plain.clone().with_batch_spec_passthrough(passthrough);

        assert_eq!(plain.id(), with_passthrough.id());
        assert!(with_passthrough.batch_spec_passthrough().is_some());
    }

    #[test]
    fn test_identifier_order_does_not_change_identity() {
        let reversed = IdDict::new().with("month", "01").with("year", "2024");
        let a = BatchDefinition::new("ds", "dc", "taxi", ids()).unwrap();
        let b = BatchDefinition::new("ds", "dc", "taxi", reversed).unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_different_asset_changes_identity() {
        let a = BatchDefinition::new("ds", "dc", "taxi", ids()).unwrap();
        let b = BatchDefinition::new("ds", "dc", "weather", ids()).unwrap();
        assert_ne!(a, b);

        let set: HashSet<BatchDefinition> = [a.clone(), a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_empty_name_is_missing() {
        let err = BatchDefinition::new("", "dc", "taxi", ids()).unwrap_err();
        assert_eq!(err, DomainError::MissingField("datasource_name".into()));
    }

    #[test]
    fn test_from_json_map_null_datasource_is_missing() {
        let map = json!({
            "datasource_name": null,
            "data_connector_name": "dc",
            "data_asset_name": "taxi",
            "batch_identifiers": {}
        });
        let err = BatchDefinition::from_json_map(map.as_object().unwrap()).unwrap_err();
        assert_eq!(err, DomainError::MissingField("datasource_name".into()));
    }

    #[test]
    fn test_from_json_map_numeric_datasource_is_type_error() {
        let map = json!({
            "datasource_name": 123,
            "data_connector_name": "dc",
            "data_asset_name": "taxi"
        });
        let err = BatchDefinition::from_json_map(map.as_object().unwrap()).unwrap_err();
        match err {
            DomainError::InvalidType { field, actual, .. } => {
                assert_eq!(field, "datasource_name");
                assert_eq!(actual, "integer");
            }
            other => panic!("Expected InvalidType, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_map_rejects_list_identifiers() {
        let map = json!({
            "datasource_name": "ds",
            "data_connector_name": "dc",
            "data_asset_name": "taxi",
            "batch_identifiers": ["2024"]
        });
        let err = BatchDefinition::from_json_map(map.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidType { ref field, .. } if field == "batch_identifiers"));
    }

    #[test]
    fn test_serde_round_trip_goes_through_validation() {
        let def = BatchDefinition::new("ds", "dc", "taxi", ids()).unwrap();
        let text = serde_json::to_string(&def).unwrap();
        let back: BatchDefinition = serde_json::from_str(&text).unwrap();
        assert_eq!(def, back);

        let bad = r#"{"datasource_name": 1, "data_connector_name": "dc", "data_asset_name": "a"}"#;
        assert!(serde_json::from_str::<BatchDefinition>(bad).is_err());
    }

    #[test]
    fn test_display_is_pretty_json() {
        let def = BatchDefinition::new("ds", "dc", "taxi", IdDict::new()).unwrap();
        let rendered = def.to_string();
        assert!(rendered.starts_with("{\n"));
        assert!(rendered.contains("\"data_asset_name\": \"taxi\""));
    }
}
