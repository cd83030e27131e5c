// assay-core/src/application/mod.rs

pub mod context;
pub mod datasource;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use assay_core::application::{DataContext, Datasource};`

pub use context::DataContext;
pub use datasource::Datasource;
