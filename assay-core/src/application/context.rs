// assay-core/src/application/context.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use super::datasource::Datasource;
use crate::domain::batch::{
    Batch, BatchDefinition, BatchRequestArguments, TypedBatchRequest,
    get_batch_request_from_acceptable_arguments,
};
use crate::domain::identity::IdDict;
use crate::domain::project::ProjectConfig;
use crate::error::AssayError;
use crate::infrastructure::adapters::DuckDbExecutionEngine;
use crate::infrastructure::config::load_project_config;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::ExecutionEngine;

/// Every datasource of a project, wired to one DuckDB engine.
pub struct DataContext {
    datasources: BTreeMap<String, Datasource>,
    execution_engine: Arc<DuckDbExecutionEngine>,
}

impl DataContext {
    #[instrument(skip(project_dir))]
    pub fn from_project_dir(project_dir: &Path) -> Result<Self, AssayError> {
        let config = load_project_config(project_dir)?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &ProjectConfig) -> Result<Self, AssayError> {
        let execution_engine = Arc::new(DuckDbExecutionEngine::new(&config.database)?);
        let mut datasources = BTreeMap::new();
        for (name, datasource_config) in &config.datasources {
            let engine: Arc<dyn ExecutionEngine> = execution_engine.clone();
            datasources.insert(
                name.clone(),
                Datasource::from_config(name, datasource_config, engine)?,
            );
        }
        info!(project = %config.name, datasources = datasources.len(), "Data context ready");
        Ok(Self {
            datasources,
            execution_engine,
        })
    }

    pub fn execution_engine(&self) -> &DuckDbExecutionEngine {
        &self.execution_engine
    }

    pub fn datasource_names(&self) -> impl Iterator<Item = &str> {
        self.datasources.keys().map(String::as_str)
    }

    pub fn get_datasource(&self, name: &str) -> Result<&Datasource, InfrastructureError> {
        self.datasources
            .get(name)
            .ok_or_else(|| InfrastructureError::DatasourceNotFound(name.to_string()))
    }

    pub fn get_datasource_mut(&mut self, name: &str) -> Result<&mut Datasource, InfrastructureError> {
        self.datasources
            .get_mut(name)
            .ok_or_else(|| InfrastructureError::DatasourceNotFound(name.to_string()))
    }

    pub fn register_filter(
        &mut self,
        datasource_name: &str,
        data_connector_name: &str,
        filter_name: &str,
        filter: impl Fn(&IdDict) -> bool + Send + Sync + 'static,
    ) -> Result<(), AssayError> {
        self.get_datasource_mut(datasource_name)?
            .register_filter(data_connector_name, filter_name, filter)
    }

    /// Normalizes loose arguments into a typed request.
    pub fn resolve_batch_request(
        &self,
        arguments: BatchRequestArguments,
    ) -> Result<TypedBatchRequest, AssayError> {
        Ok(get_batch_request_from_acceptable_arguments(arguments)?)
    }

    pub fn get_batch_definition_list(
        &self,
        arguments: BatchRequestArguments,
    ) -> Result<Vec<BatchDefinition>, AssayError> {
        let request = self.resolve_batch_request(arguments)?;
        self.get_datasource(request.datasource_name())?
            .get_batch_definition_list_from_batch_request(&request)
    }

    pub fn get_batch_list(&self, arguments: BatchRequestArguments) -> Result<Vec<Batch>, AssayError> {
        let request = self.resolve_batch_request(arguments)?;
        self.get_datasource(request.datasource_name())?
            .get_batch_list_from_batch_request(&request)
    }
}
