pub mod duckdb;

pub use self::duckdb::{DuckDbExecutionEngine, DuckDbRelation};
