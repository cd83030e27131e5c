// assay-core/src/infrastructure/connectors/filesystem.rs

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::domain::batch::{BatchDefinition, BatchSpec, RuntimeParameters, TypedBatchRequest};
use crate::domain::identity::IdDict;
use crate::domain::project::FilesystemDataConnectorConfig;
use crate::error::AssayError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::{CustomFilter, DataConnector};

pub const DEFAULT_ASSET_NAME: &str = "DEFAULT_ASSET_NAME";
const DATA_ASSET_NAME_GROUP: &str = "data_asset_name";

/// One file matched by the connector's regex.
#[derive(Debug, Clone, PartialEq)]
struct DataReference {
    relative_path: String,
    data_asset_name: String,
    batch_identifiers: IdDict,
}

/// Infers assets and batches from file names under a base directory.
pub struct InferredAssetFilesystemDataConnector {
    name: String,
    datasource_name: String,
    base_directory: PathBuf,
    pattern: Regex,
    group_names: Vec<String>,
    batch_spec_passthrough: Option<Map<String, Value>>,
    custom_filters: HashMap<String, CustomFilter>,
}

impl fmt::Debug for InferredAssetFilesystemDataConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferredAssetFilesystemDataConnector")
            .field("name", &self.name)
            .field("base_directory", &self.base_directory)
            .field("pattern", &self.pattern.as_str())
            .field("group_names", &self.group_names)
            .finish_non_exhaustive()
    }
}

impl InferredAssetFilesystemDataConnector {
    pub fn new(
        name: impl Into<String>,
        datasource_name: impl Into<String>,
        config: &FilesystemDataConnectorConfig,
    ) -> Result<Self, InfrastructureError> {
        Ok(Self {
            name: name.into(),
            datasource_name: datasource_name.into(),
            base_directory: PathBuf::from(&config.base_directory),
            pattern: Regex::new(&config.default_regex.pattern)?,
            group_names: config.default_regex.group_names.clone(),
            batch_spec_passthrough: config.batch_spec_passthrough.clone(),
            custom_filters: HashMap::new(),
        })
    }

    pub fn register_filter(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(&IdDict) -> bool + Send + Sync + 'static,
    ) {
        self.custom_filters.insert(name.into(), Arc::new(filter));
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Distinct asset names, sorted.
    pub fn get_available_data_asset_names(&self) -> Result<Vec<String>, InfrastructureError> {
        let mut names: Vec<String> = self
            .data_references()?
            .into_iter()
            .map(|r| r.data_asset_name)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn data_references(&self) -> Result<Vec<DataReference>, InfrastructureError> {
        let mut references = Vec::new();
        for entry in WalkDir::new(&self.base_directory).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.base_directory) else {
                continue;
            };
            let relative_path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if let Some(reference) = self.match_reference(&relative_path) {
                references.push(reference);
            }
        }
        references.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(references)
    }

    fn match_reference(&self, relative_path: &str) -> Option<DataReference> {
        let captures = self.pattern.captures(relative_path)?;
        let whole = captures.get(0)?;
        if whole.start() != 0 || whole.end() != relative_path.len() {
            return None;
        }

        let mut data_asset_name = DEFAULT_ASSET_NAME.to_string();
        let mut batch_identifiers = IdDict::new();
        for (i, group_name) in self.group_names.iter().enumerate() {
            let Some(value) = captures.get(i + 1) else {
                continue;
            };
            if group_name == DATA_ASSET_NAME_GROUP {
                data_asset_name = value.as_str().to_string();
            } else {
                batch_identifiers.insert(group_name.clone(), value.as_str());
            }
        }

        Some(DataReference {
            relative_path: relative_path.to_string(),
            data_asset_name,
            batch_identifiers,
        })
    }

    fn unsupported(&self, reason: impl Into<String>) -> InfrastructureError {
        InfrastructureError::UnsupportedBatchRequest {
            connector: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn apply_query(
        &self,
        references: Vec<DataReference>,
        query: Option<&Map<String, Value>>,
    ) -> Result<Vec<DataReference>, InfrastructureError> {
        let Some(query) = query else {
            return Ok(references);
        };

        let mut selected = references;

        if let Some(params) = query.get("batch_filter_parameters") {
            let params = params
                .as_object()
                .ok_or_else(|| self.unsupported("batch_filter_parameters must be a mapping"))?;
            selected.retain(|r| {
                params.iter().all(|(key, expected)| {
                    r.batch_identifiers
                        .get(key)
                        .is_some_and(|actual| identifier_matches(actual, expected))
                })
            });
        }

        if let Some(name) = query.get("custom_filter_function") {
            let name = name
                .as_str()
                .ok_or_else(|| self.unsupported("custom_filter_function must be a filter name"))?;
            let filter = self
                .custom_filters
                .get(name)
                .ok_or_else(|| self.unsupported(format!("no filter registered as '{}'", name)))?;
            selected.retain(|r| filter(&r.batch_identifiers));
        }

        if let Some(index) = query.get("index") {
            let positions = parse_index(index, selected.len())
                .map_err(|reason| self.unsupported(reason))?;
            selected = positions.into_iter().map(|i| selected[i].clone()).collect();
        }

        if let Some(limit) = query.get("limit") {
            let limit = limit
                .as_u64()
                .ok_or_else(|| self.unsupported("limit must be a non-negative integer"))?;
            selected.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        Ok(selected)
    }

    fn reader_method(path: &Path) -> Result<&'static str, InfrastructureError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" | "tsv" => Ok("read_csv"),
            "parquet" => Ok("read_parquet"),
            "json" | "jsonl" | "ndjson" => Ok("read_json"),
            other => Err(InfrastructureError::UnsupportedBatchSpec(format!(
                "no reader for '.{}' files ({})",
                other,
                path.display()
            ))),
        }
    }
}

fn identifier_matches(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(e)) => a == e,
        (Value::String(a), other) => *a == other.to_string(),
        (a, e) => a == e,
    }
}

/// Positions selected by an `index` entry: an integer, a `"start:stop[:step]"`
/// string, or a `[start, stop(, step)]` array. Negative values count from the end.
fn parse_index(index: &Value, len: usize) -> Result<Vec<usize>, String> {
    match index {
        Value::Number(n) => {
            let i = n.as_i64().ok_or("index must be an integer")?;
            Ok(single_position(i, len).into_iter().collect())
        }
        Value::String(s) if s.contains(':') => {
            let parts: Vec<&str> = s.split(':').map(str::trim).collect();
            if parts.len() > 3 {
                return Err(format!("invalid slice '{}'", s));
            }
            let bound = |i: usize| -> Result<Option<i64>, String> {
                match parts.get(i) {
                    None | Some(&"") => Ok(None),
                    Some(p) => p
                        .parse::<i64>()
                        .map(Some)
                        .map_err(|_| format!("invalid slice '{}'", s)),
                }
            };
            slice_positions(bound(0)?, bound(1)?, bound(2)?, len)
        }
        Value::String(s) => {
            let i = s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid index '{}'", s))?;
            Ok(single_position(i, len).into_iter().collect())
        }
        Value::Array(items) if (1..=3).contains(&items.len()) => {
            let bound = |i: usize| -> Result<Option<i64>, String> {
                match items.get(i) {
                    None | Some(Value::Null) => Ok(None),
                    Some(v) => v
                        .as_i64()
                        .map(Some)
                        .ok_or_else(|| "slice bounds must be integers".to_string()),
                }
            };
            slice_positions(bound(0)?, bound(1)?, bound(2)?, len)
        }
        _ => Err("index must be an integer, a slice string or a slice array".to_string()),
    }
}

fn single_position(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    (0..len).contains(&resolved).then(|| resolved as usize)
}

fn slice_positions(
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
    len: usize,
) -> Result<Vec<usize>, String> {
    let len = i64::try_from(len).map_err(|_| "too many batches".to_string())?;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err("slice step cannot be zero".to_string());
    }

    let resolve = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };

    let mut positions = Vec::new();
    if step > 0 {
        let mut i = start.map_or(0, |s| resolve(s, 0, len));
        let stop = stop.map_or(len, |s| resolve(s, 0, len));
        while i < stop {
            positions.push(i as usize);
            let Some(next) = i.checked_add(step) else { break };
            i = next;
        }
    } else {
        let mut i = start.map_or(len - 1, |s| resolve(s, -1, len - 1));
        let stop = stop.map_or(-1, |s| resolve(s, -1, len - 1));
        while i > stop {
            positions.push(i as usize);
            let Some(next) = i.checked_add(step) else { break };
            i = next;
        }
    }
    Ok(positions)
}

impl DataConnector for InferredAssetFilesystemDataConnector {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, batch_request), fields(connector = %self.name))]
    fn get_batch_definition_list_from_batch_request(
        &self,
        batch_request: &TypedBatchRequest,
    ) -> Result<Vec<BatchDefinition>, AssayError> {
        let request = match batch_request {
            TypedBatchRequest::Declarative(request) => request,
            TypedBatchRequest::Runtime(_) => {
                return Err(self
                    .unsupported("runtime batch requests need a RuntimeDataConnector")
                    .into());
            }
        };

        let references: Vec<DataReference> = self
            .data_references()?
            .into_iter()
            .filter(|r| r.data_asset_name == request.data_asset_name())
            .collect();
        debug!(matched = references.len(), "Data references found");

        let mut selected = self.apply_query(references, request.data_connector_query())?;
        if let Some(limit) = request.limit() {
            selected.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }

        selected
            .into_iter()
            .map(|r| {
                BatchDefinition::new(
                    self.datasource_name.clone(),
                    self.name.clone(),
                    r.data_asset_name,
                    r.batch_identifiers,
                )
                .map_err(AssayError::from)
            })
            .collect()
    }

    fn build_batch_spec(
        &self,
        batch_definition: &BatchDefinition,
        _runtime_parameters: Option<&RuntimeParameters>,
    ) -> Result<BatchSpec, AssayError> {
        let reference = self
            .data_references()?
            .into_iter()
            .find(|r| {
                r.data_asset_name == batch_definition.data_asset_name()
                    && &r.batch_identifiers == batch_definition.batch_identifiers()
            })
            .ok_or_else(|| {
                InfrastructureError::UnsupportedBatchSpec(format!(
                    "no file matches batch definition {}",
                    batch_definition.id()
                ))
            })?;

        let mut passthrough = self.batch_spec_passthrough.clone().unwrap_or_default();
        if let Some(overrides) = batch_definition.batch_spec_passthrough() {
            passthrough.extend(overrides.clone());
        }

        let path = self.base_directory.join(&reference.relative_path);
        let mut spec = BatchSpec::from_passthrough(Some(&passthrough))
            .with_path(path.to_string_lossy().into_owned());
        if spec.reader_method().is_none() {
            spec = spec.with(BatchSpec::READER_METHOD, Self::reader_method(&path)?);
        }
        Ok(spec)
    }

    fn add_custom_filter(&mut self, name: &str, filter: CustomFilter) -> Result<(), AssayError> {
        debug!(connector = %self.name, filter = name, "Custom filter registered");
        self.custom_filters.insert(name.to_string(), filter);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::batch::{BatchRequest, RecordSet, RuntimeBatchRequest};
    use crate::domain::project::RegexConfig;
    use anyhow::Result;
    use serde_json::json;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn fixture() -> Result<(TempDir, InferredAssetFilesystemDataConnector)> {
        let dir = tempdir()?;
        for file in [
            "taxi_2021.csv",
            "taxi_2022.csv",
            "taxi_2023.csv",
            "weather_2022.csv",
            "notes.txt",
        ] {
            fs::write(dir.path().join(file), "id,amount\n1,10\n")?;
        }
        let config = FilesystemDataConnectorConfig {
            base_directory: dir.path().to_string_lossy().into_owned(),
            default_regex: RegexConfig {
                pattern: r"(.+)_(\d{4})\.csv".into(),
                group_names: vec!["data_asset_name".into(), "year".into()],
            },
            batch_spec_passthrough: None,
        };
        let connector = InferredAssetFilesystemDataConnector::new("files", "local", &config)?;
        Ok((dir, connector))
    }

    fn years(defs: &[BatchDefinition]) -> Vec<String> {
        defs.iter()
            .map(|d| d.batch_identifiers().get("year").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    fn request(query: Option<Value>) -> TypedBatchRequest {
        let mut request = BatchRequest::new("local", "files", "taxi").unwrap();
        if let Some(query) = query {
            request = request.with_data_connector_query(obj(query));
        }
        request.into()
    }

    #[test]
    fn test_asset_names_are_inferred() -> Result<()> {
        let (_dir, connector) = fixture()?;
        assert_eq!(
            connector.get_available_data_asset_names()?,
            vec!["taxi", "weather"]
        );
        Ok(())
    }

    #[test]
    fn test_definitions_sorted_by_path() -> Result<()> {
        let (_dir, connector) = fixture()?;
        let defs = connector.get_batch_definition_list_from_batch_request(&request(None))?;
        assert_eq!(years(&defs), vec!["2021", "2022", "2023"]);
        assert!(defs.iter().all(|d| d.data_connector_name() == "files"));
        Ok(())
    }

    #[test]
    fn test_filter_parameters() -> Result<()> {
        let (_dir, connector) = fixture()?;
        let defs = connector.get_batch_definition_list_from_batch_request(&request(Some(
            json!({"batch_filter_parameters": {"year": "2022"}}),
        )))?;
        assert_eq!(years(&defs), vec!["2022"]);

        let defs = connector.get_batch_definition_list_from_batch_request(&request(Some(
            json!({"batch_filter_parameters": {"year": 2023}}),
        )))?;
        assert_eq!(years(&defs), vec!["2023"]);
        Ok(())
    }

    #[test]
    fn test_index_forms() -> Result<()> {
        let (_dir, connector) = fixture()?;
        let cases = [
            (json!(-1), vec!["2023"]),
            (json!("0:2"), vec!["2021", "2022"]),
            (json!("::-1"), vec!["2023", "2022", "2021"]),
            (json!([1, null]), vec!["2022", "2023"]),
            (json!(7), vec![]),
        ];
        for (index, expected) in cases {
            let defs = connector
                .get_batch_definition_list_from_batch_request(&request(Some(json!({"index": index.clone()}))))?;
            assert_eq!(years(&defs), expected, "index {}", index);
        }
        Ok(())
    }

    #[test]
    fn test_zero_step_is_rejected() -> Result<()> {
        let (_dir, connector) = fixture()?;
        assert!(
            connector
                .get_batch_definition_list_from_batch_request(&request(Some(json!({"index": "::0"}))))
                .is_err()
        );
        Ok(())
    }

    #[test]
    fn test_limits_apply_after_index() -> Result<()> {
        let (_dir, connector) = fixture()?;
        let defs = connector.get_batch_definition_list_from_batch_request(&request(Some(
            json!({"index": "1:", "limit": 1}),
        )))?;
        assert_eq!(years(&defs), vec!["2022"]);

        let limited: TypedBatchRequest = BatchRequest::new("local", "files", "taxi")
            .unwrap()
            .with_limit(2)
            .into();
        let defs = connector.get_batch_definition_list_from_batch_request(&limited)?;
        assert_eq!(years(&defs), vec!["2021", "2022"]);
        Ok(())
    }

    #[test]
    fn test_custom_filter_by_name() -> Result<()> {
        let (_dir, mut connector) = fixture()?;
        connector.register_filter("odd_years", |ids: &IdDict| {
            ids.get("year")
                .and_then(Value::as_str)
                .and_then(|y| y.parse::<i64>().ok())
                .is_some_and(|y| y % 2 == 1)
        });

        let defs = connector.get_batch_definition_list_from_batch_request(&request(Some(
            json!({"custom_filter_function": "odd_years"}),
        )))?;
        assert_eq!(years(&defs), vec!["2021", "2023"]);

        let unknown = connector.get_batch_definition_list_from_batch_request(&request(Some(
            json!({"custom_filter_function": "missing"}),
        )));
        assert!(unknown.is_err());
        Ok(())
    }

    #[test]
    fn test_runtime_request_is_rejected() -> Result<()> {
        let (_dir, connector) = fixture()?;
        let runtime = RuntimeBatchRequest::new(
            "local",
            "files",
            "taxi",
            RuntimeParameters::from_batch_data(RecordSet::default().into_handle()),
            obj(json!({"run": 1})),
        )?;
        assert!(
            connector
                .get_batch_definition_list_from_batch_request(&runtime.into())
                .is_err()
        );
        Ok(())
    }

    #[test]
    fn test_batch_spec_points_at_file() -> Result<()> {
        let (dir, connector) = fixture()?;
        let defs = connector.get_batch_definition_list_from_batch_request(&request(Some(
            json!({"batch_filter_parameters": {"year": "2022"}}),
        )))?;
        let definition = defs[0]
            .clone()
            .with_batch_spec_passthrough(obj(json!({"sampling_method": "sample_using_limit"})));

        let spec = connector.build_batch_spec(&definition, None)?;
        assert_eq!(
            PathBuf::from(spec.path().unwrap()),
            dir.path().join("taxi_2022.csv")
        );
        assert_eq!(spec.reader_method(), Some("read_csv"));
        assert_eq!(spec.sampling_method(), Some("sample_using_limit"));
        Ok(())
    }

    #[test]
    fn test_slice_positions_clamp_like_slices() {
        assert_eq!(slice_positions(Some(-2), None, None, 5).unwrap(), vec![3, 4]);
        assert_eq!(slice_positions(None, None, Some(2), 5).unwrap(), vec![0, 2, 4]);
        assert_eq!(slice_positions(Some(10), None, None, 3).unwrap(), Vec::<usize>::new());
        assert_eq!(slice_positions(None, Some(-4), Some(-1), 5).unwrap(), vec![4, 3, 2]);
        assert_eq!(slice_positions(Some(1), None, Some(i64::MAX), 3).unwrap(), vec![1]);
        assert_eq!(slice_positions(None, None, Some(i64::MIN), 3).unwrap(), vec![2]);
        assert_eq!(
            parse_index(&Value::String("1::9223372036854775807".into()), 3).unwrap(),
            vec![1]
        );
    }
}
