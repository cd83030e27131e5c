// assay-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum AssayError {
    // --- DOMAIN (validation, identity, argument combinations) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE (IO, parsing, engine) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<std::io::Error> for AssayError {
    fn from(err: std::io::Error) -> Self {
        AssayError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for AssayError {
    fn from(err: duckdb::Error) -> Self {
        AssayError::Infrastructure(err.into())
    }
}
