//! Juju environment wrapper for juju-docean
//!
//! The orchestration environment is consumed through the [`Environment`]
//! trait. [`JujuCli`] implements it by invoking the `juju` command line
//! client against a manual-provider environment.
//!
//! # Requirements
//!
//! - `juju` (1.x) must be installed and on `PATH`
//! - The environment must be declared in `environments.yaml` with
//!   `type: manual` (or `null`)

pub mod environment;
pub mod error;
pub mod juju;
pub mod probe;
pub mod status;

pub use environment::Environment;
pub use error::{EnvError, Result};
pub use juju::{JujuCli, STATE_SERVER_PORT};
pub use probe::port_open;
pub use status::{EnvironmentStatus, MachineRecord, MachineStatus};
