// assay-core/src/application/datasource.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domain::batch::{Batch, BatchDefinition, TypedBatchRequest};
use crate::domain::project::{DataConnectorConfig, DatasourceConfig};
use crate::error::AssayError;
use crate::infrastructure::connectors::{InferredAssetFilesystemDataConnector, RuntimeDataConnector};
use crate::infrastructure::error::InfrastructureError;
use crate::domain::identity::IdDict;
use crate::ports::{DataConnector, ExecutionEngine};

/// Named group of data connectors sharing one execution engine.
pub struct Datasource {
    name: String,
    data_connectors: BTreeMap<String, Box<dyn DataConnector>>,
    execution_engine: Arc<dyn ExecutionEngine>,
}

impl Datasource {
    pub fn new(name: impl Into<String>, execution_engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            name: name.into(),
            data_connectors: BTreeMap::new(),
            execution_engine,
        }
    }

    pub fn from_config(
        name: impl Into<String>,
        config: &DatasourceConfig,
        execution_engine: Arc<dyn ExecutionEngine>,
    ) -> Result<Self, AssayError> {
        let mut datasource = Self::new(name, execution_engine);
        for (connector_name, connector_config) in &config.data_connectors {
            let connector: Box<dyn DataConnector> = match connector_config {
                DataConnectorConfig::RuntimeDataConnector(c) => Box::new(
                    RuntimeDataConnector::from_config(connector_name, &datasource.name, c),
                ),
                DataConnectorConfig::InferredAssetFilesystemDataConnector(c) => Box::new(
                    InferredAssetFilesystemDataConnector::new(connector_name, &datasource.name, c)?,
                ),
            };
            datasource.add_data_connector(connector);
        }
        info!(
            datasource = %datasource.name,
            connectors = datasource.data_connectors.len(),
            "Datasource ready"
        );
        Ok(datasource)
    }

    pub fn add_data_connector(&mut self, connector: Box<dyn DataConnector>) {
        self.data_connectors
            .insert(connector.name().to_string(), connector);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn execution_engine(&self) -> &dyn ExecutionEngine {
        self.execution_engine.as_ref()
    }

    pub fn data_connector_names(&self) -> impl Iterator<Item = &str> {
        self.data_connectors.keys().map(String::as_str)
    }

    pub fn data_connector(&self, name: &str) -> Result<&dyn DataConnector, InfrastructureError> {
        self.data_connectors
            .get(name)
            .map(|c| c.as_ref())
            .ok_or_else(|| InfrastructureError::DataConnectorNotFound {
                datasource: self.name.clone(),
                connector: name.to_string(),
            })
    }

    /// Registers a named filter on one connector for `custom_filter_function` queries.
    pub fn register_filter(
        &mut self,
        data_connector_name: &str,
        filter_name: &str,
        filter: impl Fn(&IdDict) -> bool + Send + Sync + 'static,
    ) -> Result<(), AssayError> {
        let connector = self
            .data_connectors
            .get_mut(data_connector_name)
            .ok_or_else(|| InfrastructureError::DataConnectorNotFound {
                datasource: self.name.clone(),
                connector: data_connector_name.to_string(),
            })?;
        connector.add_custom_filter(filter_name, Arc::new(filter))
    }

    /// Definitions the request resolves to, each carrying the request's passthrough.
    #[instrument(skip(self, batch_request), fields(datasource = %self.name))]
    pub fn get_batch_definition_list_from_batch_request(
        &self,
        batch_request: &TypedBatchRequest,
    ) -> Result<Vec<BatchDefinition>, AssayError> {
        if batch_request.datasource_name() != self.name {
            return Err(InfrastructureError::DatasourceNotFound(
                batch_request.datasource_name().to_string(),
            )
            .into());
        }

        let connector = self.data_connector(batch_request.data_connector_name())?;
        let mut definitions = connector.get_batch_definition_list_from_batch_request(batch_request)?;
        if let Some(passthrough) = batch_request.batch_spec_passthrough() {
            for definition in &mut definitions {
                definition.set_batch_spec_passthrough(Some(passthrough.clone()));
            }
        }
        debug!(count = definitions.len(), "Batch definitions resolved");
        Ok(definitions)
    }

    /// Resolves, fetches and wraps every batch the request names.
    #[instrument(skip(self, batch_request), fields(datasource = %self.name))]
    pub fn get_batch_list_from_batch_request(
        &self,
        batch_request: &TypedBatchRequest,
    ) -> Result<Vec<Batch>, AssayError> {
        let connector = self.data_connector(batch_request.data_connector_name())?;
        let definitions = self.get_batch_definition_list_from_batch_request(batch_request)?;

        definitions
            .into_iter()
            .map(|definition| -> Result<Batch, AssayError> {
                let batch_spec =
                    connector.build_batch_spec(&definition, batch_request.runtime_parameters())?;
                let (data, markers) = self
                    .execution_engine
                    .load_batch_data(&definition.id(), &batch_spec)?;
                Ok(Batch::new(data)
                    .with_batch_request(batch_request.clone())
                    .with_batch_definition(definition)
                    .with_batch_spec(batch_spec)
                    .with_batch_markers(markers))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::batch::{
        BatchDataHandle, BatchMarkers, BatchRequest, BatchSpec, RecordSet, RuntimeBatchRequest,
        RuntimeParameters,
    };
    use crate::ports::{MetricConfiguration, MetricId};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Hands back whatever payload the batch spec carries and remembers the batch ids.
    #[derive(Default)]
    struct EchoEngine {
        loaded: Mutex<Vec<String>>,
    }

    impl ExecutionEngine for EchoEngine {
        fn engine_name(&self) -> &str {
            "echo"
        }

        fn load_batch_data(
            &self,
            batch_id: &str,
            batch_spec: &BatchSpec,
        ) -> Result<(BatchDataHandle, BatchMarkers), AssayError> {
            self.loaded.lock().unwrap().push(batch_id.to_string());
            let data = batch_spec
                .batch_data()
                .cloned()
                .unwrap_or_else(|| RecordSet::default().into_handle());
            Ok((data, BatchMarkers::stamped()))
        }

        fn resolve_metrics(
            &self,
            _metrics: &[MetricConfiguration],
        ) -> Result<HashMap<MetricId, Value>, AssayError> {
            Ok(HashMap::new())
        }
    }

    fn datasource(engine: Arc<EchoEngine>) -> Datasource {
        let mut datasource = Datasource::new("local", engine);
        datasource.add_data_connector(Box::new(RuntimeDataConnector::new(
            "default_runtime",
            "local",
            vec!["run_id".into()],
        )));
        datasource
    }

    fn runtime_request() -> TypedBatchRequest {
        RuntimeBatchRequest::new(
            "local",
            "default_runtime",
            "events",
            RuntimeParameters::from_batch_data(
                RecordSet::new(vec!["a".into()], vec![vec![json!(1)]]).into_handle(),
            ),
            json!({"run_id": 7}).as_object().cloned().unwrap(),
        )
        .unwrap()
        .with_batch_spec_passthrough(json!({"reader_options": {"header": true}}).as_object().cloned().unwrap())
        .into()
    }

    #[test]
    fn test_batch_list_binds_request_definition_and_markers() {
        let engine = Arc::new(EchoEngine::default());
        let batches = datasource(Arc::clone(&engine))
            .get_batch_list_from_batch_request(&runtime_request())
            .unwrap();

        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.data().type_name(), "RecordSet");
        assert!(batch.batch_request().is_some());
        assert_eq!(engine.loaded.lock().unwrap().as_slice(), [batch.id().unwrap()]);
        assert_eq!(
            batch.batch_spec().get("reader_options"),
            Some(&json!({"header": true}))
        );
    }

    #[test]
    fn test_passthrough_copied_onto_definitions() {
        let engine = Arc::new(EchoEngine::default());
        let defs = datasource(engine)
            .get_batch_definition_list_from_batch_request(&runtime_request())
            .unwrap();
        assert!(defs[0].batch_spec_passthrough().is_some());
    }

    #[test]
    fn test_wrong_datasource_or_connector() {
        let engine = Arc::new(EchoEngine::default());
        let ds = datasource(engine);

        let other_ds: TypedBatchRequest = BatchRequest::new("elsewhere", "default_runtime", "a")
            .unwrap()
            .into();
        assert!(matches!(
            ds.get_batch_list_from_batch_request(&other_ds).unwrap_err(),
            AssayError::Infrastructure(InfrastructureError::DatasourceNotFound(_))
        ));

        let other_dc: TypedBatchRequest = BatchRequest::new("local", "nope", "a").unwrap().into();
        assert!(matches!(
            ds.get_batch_list_from_batch_request(&other_dc).unwrap_err(),
            AssayError::Infrastructure(InfrastructureError::DataConnectorNotFound { .. })
        ));
    }
}
