//! Environment error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    /// A juju invocation exited unsuccessfully; carries its output transcript
    #[error("juju command failed: {command}\n{transcript}")]
    CommandFailed { command: String, transcript: String },

    #[error("juju not found. Please install juju and make sure it is on PATH")]
    JujuNotFound,

    #[error("Invalid environment state: {0}")]
    InvalidState(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] juju_docean_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, EnvError>;
