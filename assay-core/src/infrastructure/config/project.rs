// assay-core/src/infrastructure/config/project.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::project::{DataConnectorConfig, ProjectConfig};
use crate::infrastructure::error::InfrastructureError;

pub const ENV_DATABASE: &str = "ASSAY_DATABASE";
pub const ENV_DATA_DIR: &str = "ASSAY_DATA_DIR";

const CANDIDATES: [&str; 2] = ["assay.yaml", "assay.yml"];

/// Loads, validates and layers the project file found in `project_dir`.
///
/// Relative `base_directory` entries come back rooted at the data dir
/// (`ASSAY_DATA_DIR`, or the project dir when unset).
#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    load_project_config_with_env(project_dir, |key| std::env::var(key).ok())
}

/// Same as [`load_project_config`], reading overrides through `env`.
pub fn load_project_config_with_env(
    project_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    let content = fs::read_to_string(&config_path)?;
    let mut config: ProjectConfig = serde_yaml::from_str(&content)?;
    config.validate()?;

    apply_env_overrides(&mut config, project_dir, env);
    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    CANDIDATES
        .iter()
        .map(|filename| root.join(filename))
        .find(|p| p.exists())
        .ok_or_else(|| {
            InfrastructureError::ConfigNotFound(format!(
                "No configuration file found in {:?}. Checked: {:?}",
                root, CANDIDATES
            ))
        })
}

// Layering: file values first, environment on top.
fn apply_env_overrides(
    config: &mut ProjectConfig,
    project_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) {
    if let Some(val) = env(ENV_DATABASE) {
        info!(old = ?config.database, new = ?val, "Overriding database via ENV");
        config.database = val;
    }

    let data_root = match env(ENV_DATA_DIR) {
        Some(dir) => {
            info!(data_dir = ?dir, "Overriding data directory via ENV");
            PathBuf::from(dir)
        }
        None => project_dir.to_path_buf(),
    };

    for datasource in config.datasources.values_mut() {
        for connector in datasource.data_connectors.values_mut() {
            if let DataConnectorConfig::InferredAssetFilesystemDataConnector(fs_config) = connector
            {
                let base = Path::new(&fs_config.base_directory);
                if base.is_relative() {
                    fs_config.base_directory = data_root.join(base).to_string_lossy().into_owned();
                }
            }
        }
    }
}
