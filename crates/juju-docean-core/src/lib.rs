//! juju-docean core
//!
//! Provisions DigitalOcean instances and reconciles them with a juju
//! manual-provider environment.
//!
//! - [`constraints`]: resolve series/size/region tokens to provider ids
//! - [`operation`]: the add / register / destroy protocols
//! - [`runner`]: bounded-concurrency executor yielding outcomes as they complete
//! - [`reconcile`]: address-keyed join between juju machines and instances
//! - [`commands`]: the user-facing workflows built on the above

pub mod commands;
pub mod constraints;
pub mod error;
pub mod operation;
pub mod reconcile;
pub mod runner;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use commands::CommandContext;
pub use constraints::{ConstraintSpec, ImageCatalog, ResolvedConstraints};
pub use error::{CommandError, OperationError, RegistrationFailure, Result};
pub use operation::{
    DestroyMode, DestroyOutcome, MachineAdd, MachineDestroy, MachineRegister, Operation,
    OperationOutput, OperationState,
};
pub use reconcile::{AddressJoin, DestroyDirective, Drift, ReconciliationView};
pub use runner::{Completed, Results, Runner};
