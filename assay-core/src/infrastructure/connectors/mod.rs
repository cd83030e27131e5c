pub mod filesystem;
pub mod runtime;

pub use filesystem::{DEFAULT_ASSET_NAME, InferredAssetFilesystemDataConnector};
pub use runtime::RuntimeDataConnector;
