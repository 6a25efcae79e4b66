use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Service file not found. Looked for:\n\
        - current directory: stackflow.local.yml, stackflow.yml, stackflow.yaml, serverless.yml, serverless.yaml\n\
        - the STACKFLOW_CONFIG_PATH environment variable"
    )]
    ServiceFileNotFound,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid service definition: {0}")]
    Invalid(String),

    #[error("Failed to parse settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
