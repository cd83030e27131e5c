// assay-core/src/infrastructure/connectors/runtime.rs

use tracing::{debug, instrument};

use crate::domain::batch::{BatchDefinition, BatchSpec, RuntimeParameters, TypedBatchRequest};
use crate::domain::identity::IdDict;
use crate::domain::project::RuntimeDataConnectorConfig;
use crate::error::AssayError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::DataConnector;

/// Serves batches the caller hands over directly: a payload, a query or a path.
#[derive(Debug, Clone)]
pub struct RuntimeDataConnector {
    name: String,
    datasource_name: String,
    batch_identifiers: Vec<String>,
}

impl RuntimeDataConnector {
    pub fn new(
        name: impl Into<String>,
        datasource_name: impl Into<String>,
        batch_identifiers: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            datasource_name: datasource_name.into(),
            batch_identifiers,
        }
    }

    pub fn from_config(
        name: impl Into<String>,
        datasource_name: impl Into<String>,
        config: &RuntimeDataConnectorConfig,
    ) -> Self {
        Self::new(name, datasource_name, config.batch_identifiers.clone())
    }

    fn check_identifiers(&self, ids: &IdDict) -> Result<(), InfrastructureError> {
        let undeclared: Vec<String> = ids
            .keys()
            .filter(|key| !self.batch_identifiers.contains(*key))
            .cloned()
            .collect();
        if undeclared.is_empty() {
            Ok(())
        } else {
            Err(InfrastructureError::InvalidBatchIdentifiers {
                connector: self.name.clone(),
                keys: undeclared,
            })
        }
    }
}

impl DataConnector for RuntimeDataConnector {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, batch_request), fields(connector = %self.name))]
    fn get_batch_definition_list_from_batch_request(
        &self,
        batch_request: &TypedBatchRequest,
    ) -> Result<Vec<BatchDefinition>, AssayError> {
        let request = match batch_request {
            TypedBatchRequest::Runtime(request) => request,
            TypedBatchRequest::Declarative(_) => {
                return Err(InfrastructureError::UnsupportedBatchRequest {
                    connector: self.name.clone(),
                    reason: "only runtime batch requests are accepted".into(),
                }
                .into());
            }
        };

        let ids = IdDict::from(request.batch_identifiers().clone());
        self.check_identifiers(&ids)?;

        let definition = BatchDefinition::new(
            self.datasource_name.clone(),
            self.name.clone(),
            request.data_asset_name(),
            ids,
        )?;
        debug!(batch_id = %definition.id(), "Runtime batch definition built");
        Ok(vec![definition])
    }

    fn build_batch_spec(
        &self,
        batch_definition: &BatchDefinition,
        runtime_parameters: Option<&RuntimeParameters>,
    ) -> Result<BatchSpec, AssayError> {
        let params = runtime_parameters.ok_or_else(|| {
            InfrastructureError::UnsupportedBatchSpec(
                "runtime batches need runtime_parameters".into(),
            )
        })?;

        let mut spec = BatchSpec::from_passthrough(batch_definition.batch_spec_passthrough());
        for (key, value) in params.params() {
            if key != RuntimeParameters::BATCH_DATA {
                spec = spec.with(key.clone(), value.clone());
            }
        }
        if let Some(data) = params.batch_data() {
            spec = spec.with_batch_data(data.clone());
        }

        if spec.batch_data().is_none() && spec.query().is_none() && spec.path().is_none() {
            return Err(InfrastructureError::UnsupportedBatchSpec(
                "runtime_parameters must carry batch_data, query or path".into(),
            )
            .into());
        }
        Ok(spec)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::batch::{BatchRequest, RecordSet, RuntimeBatchRequest};
    use serde_json::{Map, Value, json};
    use std::sync::Arc;

    fn ids(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn connector() -> RuntimeDataConnector {
        RuntimeDataConnector::new("default_runtime", "local", vec!["run_id".into()])
    }

    #[test]
    fn test_single_definition_from_identifiers() {
        let request = RuntimeBatchRequest::new(
            "local",
            "default_runtime",
            "events",
            RuntimeParameters::from_query("SELECT 1"),
            ids(json!({"run_id": 42})),
        )
        .unwrap();

        let defs = connector()
            .get_batch_definition_list_from_batch_request(&request.into())
            .unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].data_asset_name(), "events");
        assert_eq!(defs[0].batch_identifiers().to_id().as_deref(), Some("run_id=42"));
    }

    #[test]
    fn test_undeclared_identifier_is_rejected() {
        let request = RuntimeBatchRequest::new(
            "local",
            "default_runtime",
            "events",
            RuntimeParameters::from_query("SELECT 1"),
            ids(json!({"run_id": 1, "stage": "prod"})),
        )
        .unwrap();

        let err = connector()
            .get_batch_definition_list_from_batch_request(&request.into())
            .unwrap_err();
        match err {
            AssayError::Infrastructure(InfrastructureError::InvalidBatchIdentifiers { keys, .. }) => {
                assert_eq!(keys, vec!["stage"]);
            }
            other => panic!("Expected InvalidBatchIdentifiers, got {:?}", other),
        }
    }

    #[test]
    fn test_declarative_request_is_rejected() {
        let request = BatchRequest::new("local", "default_runtime", "events").unwrap();
        assert!(
            connector()
                .get_batch_definition_list_from_batch_request(&request.into())
                .is_err()
        );
    }

    #[test]
    fn test_batch_spec_carries_payload_and_passthrough() {
        let data = RecordSet::default().into_handle();
        let params = RuntimeParameters::from_batch_data(Arc::clone(&data));
        let definition = BatchDefinition::new("local", "default_runtime", "events", IdDict::new())
            .unwrap()
            .with_batch_spec_passthrough(ids(json!({"sampling_method": "sample_using_limit"})));

        let spec = connector().build_batch_spec(&definition, Some(&params)).unwrap();
        assert!(Arc::ptr_eq(spec.batch_data().unwrap(), &data));
        assert_eq!(spec.sampling_method(), Some("sample_using_limit"));
    }

    #[test]
    fn test_batch_spec_requires_a_source() {
        let definition =
            BatchDefinition::new("local", "default_runtime", "events", IdDict::new()).unwrap();
        let mut params = RuntimeParameters::new();
        params.insert("reader_options", json!({}));
        assert!(connector().build_batch_spec(&definition, Some(&params)).is_err());
        assert!(connector().build_batch_spec(&definition, None).is_err());
    }
}
