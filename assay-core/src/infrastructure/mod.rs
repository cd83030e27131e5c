// assay-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod connectors;
pub mod error;
