// assay-core/src/lib.rs

// 1. Documentation is optional for now
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts for data connectors and execution engines.
pub mod ports;

// 2. Domain (Business core)
// Identity, batch model, request resolution, project configuration.
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB engine, filesystem/runtime connectors, YAML config loading.
pub mod infrastructure;

// 4. Application (Use Cases)
// Datasources and the project-wide data context.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::AssayError;
