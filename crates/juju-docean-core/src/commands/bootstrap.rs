//! Bootstrap: launch the state server instance and bootstrap juju on it

use juju_docean_cloud::Instance;
use tracing::{error, info, warn};

use super::CommandContext;
use crate::error::{CommandError, Result};

pub struct Bootstrap<'a> {
    ctx: &'a CommandContext,
}

impl<'a> Bootstrap<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Returns the state server instance
    pub async fn run(&self) -> Result<Instance> {
        let keys = self.ctx.check_preconditions().await?;
        if self.ctx.env.is_running().await? {
            return Err(CommandError::Precheck(format!(
                "Environment {} is already bootstrapped",
                self.ctx.env_name()
            )));
        }

        let resolved = self.ctx.solve_constraints().await?;
        let name = format!("{}-0", self.ctx.env_name());
        let spec = self.ctx.instance_spec(name, &resolved, &keys);

        info!("Launching bootstrap host (eta 5m)...");
        let instance = self.ctx.machine_add(spec).run().await?;
        let Some(address) = instance.address().map(str::to_string) else {
            return Err(CommandError::Internal(format!(
                "bootstrap host {} has no address",
                instance.id
            )));
        };

        info!("Bootstrapping environment...");
        if let Err(e) = self.ctx.env.bootstrap(&address).await {
            error!("Bootstrap failed, terminating instance {}", instance.id);
            if let Err(cleanup) = self.ctx.provider.destroy_instance(instance.id).await {
                warn!(
                    "Could not destroy bootstrap host id:{} ip:{}: {}",
                    instance.id, address, cleanup
                );
            }
            return Err(e.into());
        }

        info!("Bootstrap complete.");
        Ok(instance)
    }
}
