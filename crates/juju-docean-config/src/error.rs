use std::path::PathBuf;
use thiserror::Error;

/// User configuration errors. Never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Home directory not found; set JUJU_HOME explicitly")]
    HomeDirNotFound,

    #[error("Missing api credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("No juju environment specified; use --environment or JUJU_ENV")]
    MissingEnvironmentName,

    #[error("Environments file not found: {}", .0.display())]
    EnvironmentsFileNotFound(PathBuf),

    #[error("Invalid environments.yaml: {0}")]
    InvalidEnvironmentsFile(String),

    #[error("Environment {0:?} not in environments.yaml")]
    EnvironmentNotFound(String),

    #[error("Environment {name:?} provider type is {provider_type:?} must be 'null'")]
    UnsupportedProviderType {
        name: String,
        provider_type: String,
    },

    #[error("Environment {0:?} already has a bootstrap-host")]
    BootstrapHostAlreadySet(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Invalid constraints: {0}")]
    InvalidConstraints(String),

    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    #[error("No image available for series: {0}")]
    NoImageForSeries(String),

    #[error("Unknown instance size: {0}")]
    UnknownSize(String),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
