pub mod error;
pub mod settings;

pub use error::*;
pub use settings::Settings;

use stackflow_core::ServiceDefinition;
use std::path::{Path, PathBuf};

/// Environment variable pointing directly at a service file
pub const CONFIG_PATH_ENV: &str = "STACKFLOW_CONFIG_PATH";

/// Service file names in lookup order
pub const SERVICE_FILE_CANDIDATES: [&str; 5] = [
    "stackflow.local.yml",
    "stackflow.yml",
    "stackflow.yaml",
    "serverless.yml",
    "serverless.yaml",
];

/// stackflow's user config directory, created on first use
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Finds the service file for the current directory.
///
/// Lookup order:
/// 1. `STACKFLOW_CONFIG_PATH`
/// 2. [`SERVICE_FILE_CANDIDATES`] in the current directory
pub fn find_service_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at {}, which does not exist",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    find_service_file_in(&std::env::current_dir()?)
}

/// Finds the first candidate service file inside `dir`
pub fn find_service_file_in(dir: &Path) -> Result<PathBuf> {
    SERVICE_FILE_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .ok_or(ConfigError::ServiceFileNotFound)
}

/// Reads and validates a service file
pub fn load_service(path: &Path) -> Result<ServiceDefinition> {
    let content = std::fs::read_to_string(path)?;
    let service = parse_service(&content).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    tracing::debug!(
        "Loaded service '{}' with {} functions from {}",
        service.service,
        service.functions.len(),
        path.display()
    );
    Ok(service)
}

/// Parses and validates service YAML
pub fn parse_service(content: &str) -> Result<ServiceDefinition> {
    let service: ServiceDefinition =
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
    validate(&service)?;
    Ok(service)
}

fn validate(service: &ServiceDefinition) -> Result<()> {
    if service.service.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "'service' must name the service".to_string(),
        ));
    }
    for (name, function) in &service.functions {
        if function.handler.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "function '{name}' has no handler"
            )));
        }
    }
    Ok(())
}
