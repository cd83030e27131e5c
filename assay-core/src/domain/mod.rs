pub mod batch;
pub mod error;
pub mod identity;
pub mod project;

// Re-exports for shorter imports elsewhere
pub use error::DomainError;
