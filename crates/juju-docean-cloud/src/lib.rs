//! juju-docean cloud provider abstraction
//!
//! This crate defines the capability the orchestration layer consumes from a
//! compute provider: listing, creating and destroying instances, plus the
//! catalog lookups (images, regions, ssh keys) needed to resolve constraints.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 juju-docean CLI                  │
//! │   (bootstrap / add-machine / terminate / ...)    │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                juju-docean-core                  │
//! │  constraints · operations · runner · reconcile   │
//! └───────┬─────────────────────────┬───────────────┘
//!         │                         │
//! ┌───────▼────────────┐   ┌────────▼──────────────┐
//! │ juju-docean-cloud  │   │   juju-docean-env     │
//! │ trait CloudProvider│   │   trait Environment   │
//! └───────┬────────────┘   └───────────────────────┘
//!         │
//! ┌───────▼────────────┐
//! │  juju-docean-api   │
//! │ DigitalOcean REST  │
//! └────────────────────┘
//! ```

pub mod error;
pub mod model;
pub mod provider;

// Re-exports
pub use error::{CloudError, Result};
pub use model::{Image, Instance, InstanceSpec, InstanceStatus, Region, SshKey};
pub use provider::CloudProvider;
