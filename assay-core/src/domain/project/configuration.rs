// assay-core/src/domain/project/configuration.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ProjectConfig {
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// DuckDB database path; `:memory:` keeps everything in process.
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    #[validate(custom(function = "validate_datasources"))]
    pub datasources: BTreeMap<String, DatasourceConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, Validate)]
pub struct DatasourceConfig {
    #[serde(default)]
    #[validate(custom(function = "validate_data_connectors"))]
    pub data_connectors: BTreeMap<String, DataConnectorConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "class_name")]
pub enum DataConnectorConfig {
    RuntimeDataConnector(RuntimeDataConnectorConfig),
    InferredAssetFilesystemDataConnector(FilesystemDataConnectorConfig),
}

/// Batches passed in by the caller; only the declared identifier keys are accepted.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct RuntimeDataConnectorConfig {
    #[serde(default)]
    pub batch_identifiers: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct FilesystemDataConnectorConfig {
    #[validate(length(min = 1, message = "base_directory cannot be empty"))]
    pub base_directory: String,

    #[validate(nested)]
    pub default_regex: RegexConfig,

    #[serde(default)]
    pub batch_spec_passthrough: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct RegexConfig {
    #[validate(length(min = 1, message = "Regex cannot be empty"))]
    #[validate(custom(function = "validate_pattern"))]
    pub pattern: String,

    /// Names for the capture groups, in order. `data_asset_name` names the asset.
    #[serde(default)]
    pub group_names: Vec<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_database() -> String {
    ":memory:".to_string()
}

fn validate_pattern(pattern: &str) -> Result<(), ValidationError> {
    Regex::new(pattern).map(|_| ()).map_err(|e| {
        ValidationError::new("invalid_regex").with_message(Cow::Owned(e.to_string()))
    })
}

fn validate_datasources(
    datasources: &BTreeMap<String, DatasourceConfig>,
) -> Result<(), ValidationError> {
    for (name, datasource) in datasources {
        datasource.validate().map_err(|e| {
            ValidationError::new("invalid_datasource")
                .with_message(Cow::Owned(format!("datasource '{}': {}", name, e)))
        })?;
    }
    Ok(())
}

fn validate_data_connectors(
    connectors: &BTreeMap<String, DataConnectorConfig>,
) -> Result<(), ValidationError> {
    for (name, connector) in connectors {
        if let DataConnectorConfig::InferredAssetFilesystemDataConnector(config) = connector {
            config.validate().map_err(|e| {
                ValidationError::new("invalid_data_connector")
                    .with_message(Cow::Owned(format!("data connector '{}': {}", name, e)))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"
name: demo
datasources:
  taxi_source:
    data_connectors:
      default_runtime:
        class_name: RuntimeDataConnector
        batch_identifiers: [run_id]
      files:
        class_name: InferredAssetFilesystemDataConnector
        base_directory: data
        default_regex:
          pattern: "(.+)_(\\d{4})\\.csv"
          group_names: [data_asset_name, year]
"#;

    #[test]
    fn test_parse_tagged_connectors() {
        let config: ProjectConfig = serde_yaml::from_str(PROJECT).unwrap();
        assert_eq!(config.database, ":memory:");

        let connectors = &config.datasources["taxi_source"].data_connectors;
        match &connectors["default_runtime"] {
            DataConnectorConfig::RuntimeDataConnector(c) => {
                assert_eq!(c.batch_identifiers, vec!["run_id"]);
            }
            other => panic!("Expected runtime connector, got {:?}", other),
        }
        match &connectors["files"] {
            DataConnectorConfig::InferredAssetFilesystemDataConnector(c) => {
                assert_eq!(c.default_regex.group_names, vec!["data_asset_name", "year"]);
            }
            other => panic!("Expected filesystem connector, got {:?}", other),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_regex_fails_validation() {
        let yaml = PROJECT.replace(r#""(.+)_(\\d{4})\\.csv""#, r#""(unclosed""#);
        let config: ProjectConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_class_name_is_rejected() {
        let yaml = PROJECT.replace("class_name: RuntimeDataConnector", "class_name: Nope");
        assert!(serde_yaml::from_str::<ProjectConfig>(&yaml).is_err());
    }
}
