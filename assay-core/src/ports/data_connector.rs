// assay-core/src/ports/data_connector.rs

use std::sync::Arc;

use crate::domain::batch::{BatchDefinition, BatchSpec, RuntimeParameters, TypedBatchRequest};
use crate::domain::identity::IdDict;
use crate::error::AssayError;
use crate::infrastructure::error::InfrastructureError;

/// Named predicate over batch identifiers, selectable from a data connector query.
pub type CustomFilter = Arc<dyn Fn(&IdDict) -> bool + Send + Sync>;

/// Turns batch requests into the concrete batches a source can produce.
pub trait DataConnector: Send + Sync {
    fn name(&self) -> &str;

    /// Every batch matching the request, in a stable order.
    fn get_batch_definition_list_from_batch_request(
        &self,
        batch_request: &TypedBatchRequest,
    ) -> Result<Vec<BatchDefinition>, AssayError>;

    /// Fetch instructions for one definition. Runtime requests pass their parameters along.
    fn build_batch_spec(
        &self,
        batch_definition: &BatchDefinition,
        runtime_parameters: Option<&RuntimeParameters>,
    ) -> Result<BatchSpec, AssayError>;

    /// Makes `filter` selectable as `custom_filter_function`. Connectors without
    /// query support refuse it.
    fn add_custom_filter(&mut self, name: &str, _filter: CustomFilter) -> Result<(), AssayError> {
        Err(InfrastructureError::UnsupportedBatchRequest {
            connector: self.name().to_string(),
            reason: format!("cannot register custom filter '{}'", name),
        }
        .into())
    }
}
