// assay-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, PartialEq)]
pub enum DomainError {
    // --- TYPE ERRORS ---
    #[error(
        "The type of {field} must be {expected}. The type given is \"{actual}\", which is illegal."
    )]
    #[diagnostic(code(assay::domain::invalid_type))]
    InvalidType {
        field: String,
        expected: &'static str,
        actual: String,
    },

    #[error("The {field} value {value} does not fit in a signed 64-bit integer.")]
    #[diagnostic(code(assay::domain::out_of_range))]
    OutOfRange { field: String, value: String },

    // --- REQUIRED FIELDS ---
    #[error("A valid {0} must be specified.")]
    #[diagnostic(code(assay::domain::missing_field))]
    MissingField(String),

    #[error("The {field} must be a non-empty {expected}.")]
    #[diagnostic(
        code(assay::domain::empty_field),
        help("A runtime batch request needs both parameters and identifiers to be meaningful.")
    )]
    EmptyField {
        field: String,
        expected: &'static str,
    },

    #[error("Unexpected field '{field}' for {request_type}")]
    #[diagnostic(code(assay::domain::unexpected_field))]
    UnexpectedField {
        field: String,
        request_type: &'static str,
    },

    // --- ARGUMENT COMBINATIONS ---
    #[error("{0}")]
    #[diagnostic(code(assay::domain::conflicting_arguments))]
    ConflictingArguments(String),

    // --- IDENTITY / PROVENANCE ---
    #[error("Invalid batch id: {0}")]
    #[diagnostic(code(assay::domain::invalid_batch_id))]
    InvalidBatchId(String),

    // --- METRICS ---
    #[error("Metric '{0}' is not supported by this execution engine")]
    #[diagnostic(code(assay::domain::unsupported_metric))]
    UnsupportedMetric(String),

    #[error("Metric '{0}' was not resolved by the execution engine")]
    #[diagnostic(code(assay::domain::metric_not_resolved))]
    MetricNotResolved(String),
}

impl DomainError {
    pub(crate) fn invalid_type(
        field: impl Into<String>,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        DomainError::InvalidType {
            field: field.into(),
            expected,
            actual: actual.into(),
        }
    }
}
