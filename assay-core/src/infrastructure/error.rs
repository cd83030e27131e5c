// assay-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(assay::infra::database::duckdb),
        help("An error occurred inside the SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("DuckDB connection lock poisoned")]
    #[diagnostic(code(assay::infra::database::poisoned))]
    Poisoned,
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(assay::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    #[error("Directory walk failed: {0}")]
    #[diagnostic(code(assay::infra::walk))]
    Walk(#[from] walkdir::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(assay::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(assay::infra::validation))]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid regex: {0}")]
    #[diagnostic(code(assay::infra::regex))]
    Regex(#[from] regex::Error),

    #[error("Project configuration not found at '{0}'")]
    #[diagnostic(code(assay::infra::config_missing))]
    ConfigNotFound(String),

    // --- ROUTING ---
    #[error("Datasource '{0}' is not configured")]
    #[diagnostic(code(assay::infra::datasource_not_found))]
    DatasourceNotFound(String),

    #[error("Data connector '{connector}' is not configured on datasource '{datasource}'")]
    #[diagnostic(code(assay::infra::data_connector_not_found))]
    DataConnectorNotFound {
        datasource: String,
        connector: String,
    },

    #[error("Data connector '{connector}' does not declare batch identifiers {keys:?}")]
    #[diagnostic(
        code(assay::infra::invalid_batch_identifiers),
        help("Declare every identifier under `batch_identifiers` in assay.yaml.")
    )]
    InvalidBatchIdentifiers { connector: String, keys: Vec<String> },

    #[error("Unsupported batch request for data connector '{connector}': {reason}")]
    #[diagnostic(code(assay::infra::unsupported_batch_request))]
    UnsupportedBatchRequest { connector: String, reason: String },

    #[error("Unsupported batch spec: {0}")]
    #[diagnostic(code(assay::infra::unsupported_batch_spec))]
    UnsupportedBatchSpec(String),
}

// Shortcut for `?` on duckdb calls
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
