//! DigitalOcean provider error types

use juju_docean_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigitalOceanError {
    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<DigitalOceanError> for CloudError {
    fn from(err: DigitalOceanError) -> Self {
        match err {
            DigitalOceanError::Api { status, message } => CloudError::Api { status, message },
            DigitalOceanError::Http(e) => CloudError::Transport(e.to_string()),
            DigitalOceanError::Json(e) => CloudError::Json(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, DigitalOceanError>;
