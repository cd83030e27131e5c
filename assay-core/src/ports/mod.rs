// assay-core/src/ports/mod.rs

pub mod data_connector;
pub mod execution_engine;

pub use data_connector::{CustomFilter, DataConnector};
pub use execution_engine::{ExecutionEngine, MetricConfiguration, MetricId};
