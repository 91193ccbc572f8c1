//! Command workflows
//!
//! Each command resolves constraints at most once, builds operations,
//! drains them through a [`Runner`] and returns a report. Per-machine
//! failures end up in the report; only configuration and precondition
//! failures abort a command, and they do so before anything is queued.

pub mod add_machine;
pub mod bootstrap;
pub mod destroy;
pub mod list;
pub mod terminate;

pub use add_machine::{AddMachine, AddReport, FailedAdd};
pub use bootstrap::Bootstrap;
pub use destroy::{DestroyEnvironment, DestroyReport};
pub use list::{ListMachines, MachineRow, MachineTable};
pub use terminate::{TerminateMachine, TerminateReport};

use juju_docean_cloud::{CloudProvider, InstanceSpec};
use juju_docean_config::{Config, EnvironmentsFile};
use juju_docean_env::Environment;
use std::sync::Arc;
use tracing::debug;

use crate::constraints::{self, ConstraintSpec, ResolvedConstraints};
use crate::error::{CommandError, Result};
use crate::operation::MachineAdd;
use crate::runner::Runner;

/// Shared handles for every command
#[derive(Clone)]
pub struct CommandContext {
    pub config: Arc<Config>,
    pub provider: Arc<dyn CloudProvider>,
    pub env: Arc<dyn Environment>,
}

impl CommandContext {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn CloudProvider>,
        env: Arc<dyn Environment>,
    ) -> Self {
        Self {
            config,
            provider,
            env,
        }
    }

    pub fn env_name(&self) -> &str {
        &self.config.env_name
    }

    /// Fresh runner sized by the configured worker count
    pub fn runner(&self) -> Runner {
        Runner::new(self.config.workers)
    }

    pub fn constraint_spec(&self) -> Result<ConstraintSpec> {
        Ok(ConstraintSpec::parse(
            &self.config.series,
            &self.config.constraints,
        )?)
    }

    /// Resolve the configured constraints to provider ids
    pub async fn solve_constraints(&self) -> Result<ResolvedConstraints> {
        let spec = self.constraint_spec()?;
        let resolved = constraints::resolve(self.provider.as_ref(), &spec).await?;
        debug!(
            "Resolved {:?} to image:{} size:{} region:{}",
            spec, resolved.image_id, resolved.size_id, resolved.region_id
        );
        Ok(resolved)
    }

    pub async fn ssh_key_ids(&self) -> Result<Vec<u64>> {
        let keys = self.provider.list_ssh_keys().await?;
        Ok(keys.into_iter().map(|k| k.id).collect())
    }

    /// At least one provider ssh key, and a manual environment in
    /// `environments.yaml` without a bootstrap host. Returns the key ids.
    pub async fn check_preconditions(&self) -> Result<Vec<u64>> {
        let keys = self.ssh_key_ids().await?;
        if keys.is_empty() {
            return Err(CommandError::Precheck(
                "SSH Public Key must be uploaded to digital ocean".to_string(),
            ));
        }

        let environments = EnvironmentsFile::load(&self.config.env_conf_path())?;
        environments.check_unbootstrapped_manual(self.env_name())?;
        Ok(keys)
    }

    pub fn instance_spec(
        &self,
        name: impl Into<String>,
        resolved: &ResolvedConstraints,
        ssh_key_ids: &[u64],
    ) -> InstanceSpec {
        InstanceSpec::new(
            name,
            resolved.image_id,
            resolved.size_id,
            resolved.region_id,
            ssh_key_ids.to_vec(),
        )
    }

    pub fn machine_add(&self, spec: InstanceSpec) -> MachineAdd {
        MachineAdd::new(
            Arc::clone(&self.provider),
            spec,
            self.config.provisioning_wait,
        )
        .with_ssh_wait(self.config.wait_for_ssh)
    }
}
