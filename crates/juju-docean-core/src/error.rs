//! Operation and command error types

use juju_docean_cloud::{CloudError, Instance};
use juju_docean_config::ConfigError;
use juju_docean_env::EnvError;
use std::time::Duration;
use thiserror::Error;

/// Terminal failure of a single operation
///
/// Failures are values in the runner's result stream; they never abort
/// sibling operations.
#[derive(Error, Debug)]
pub enum OperationError {
    /// The provider refused to create the instance, or failed while we
    /// were waiting on it.
    #[error("provisioning failed: {0}")]
    Provisioning(#[source] CloudError),

    /// The instance never became active with an address. It may still exist.
    #[error("instance {instance_id} not ready after {waited:?}")]
    ProvisioningTimeout { instance_id: u64, waited: Duration },

    /// The instance is up but the environment did not take it.
    #[error(
        "instance {} ({}) provisioned but not registered: {source}",
        .instance.id,
        .instance.name
    )]
    Registration {
        instance: Box<Instance>,
        source: RegistrationFailure,
    },

    #[error("provider call failed: {0}")]
    Provider(#[source] CloudError),

    #[error("environment command failed: {0}")]
    Environment(#[source] EnvError),

    #[error("operation {operation} panicked: {message}")]
    Panicked { operation: String, message: String },
}

impl OperationError {
    /// Provider instance left behind by this failure, if any
    pub fn orphaned_instance(&self) -> Option<u64> {
        match self {
            OperationError::ProvisioningTimeout { instance_id, .. } => Some(*instance_id),
            OperationError::Registration { instance, .. } => Some(instance.id),
            _ => None,
        }
    }
}

/// Why a provisioned instance could not be registered
#[derive(Error, Debug)]
pub enum RegistrationFailure {
    #[error(transparent)]
    Refused(EnvError),

    #[error("machine at {address} not listed in environment status after {waited:?}")]
    NotListed { address: String, waited: Duration },
}

/// Command-level errors
///
/// `Config` and `Precheck` are raised before any operation is queued.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Precheck failed: {0}")]
    Precheck(String),

    #[error(transparent)]
    Provider(#[from] CloudError),

    #[error(transparent)]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CommandError>;
