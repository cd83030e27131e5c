// assay-core/src/domain/batch/mod.rs

pub mod data;
pub mod definition;
pub mod markers;
pub mod materialized;
pub mod request;
pub mod resolution;
pub mod spec;

pub use data::{BatchData, BatchDataHandle, RecordSet, safe_deep_copy};
pub use definition::BatchDefinition;
pub use markers::BatchMarkers;
pub use materialized::{Batch, BatchIdentity};
pub use request::{
    BatchRequest, BatchRequestBase, RuntimeBatchRequest, RuntimeParameters, TypedBatchRequest,
};
pub use resolution::{
    BatchRequestArguments, BatchRequestRef, batch_request_contains_batch_data,
    batch_request_contains_runtime_parameters, get_batch_request_as_dict,
    get_batch_request_from_acceptable_arguments, materialize_batch_request,
    standardize_batch_request_display_ordering,
};
pub use spec::BatchSpec;
