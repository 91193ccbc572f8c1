//! DestroyEnvironment: tear down every machine, the environment and its
//! state server

use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::CommandContext;
use super::terminate::{TerminateReport, terminate_machines};
use crate::error::{OperationError, Result};
use crate::operation::{DestroyMode, MachineDestroy, Operation};

/// Machine id of the state server
const STATE_SERVER_MACHINE: &str = "0";

#[derive(Debug, Default)]
pub struct DestroyReport {
    /// Machine teardown before the environment was destroyed (normal path)
    pub machines: TerminateReport,
    /// State server instance, when one was resolved and destroyed
    pub state_server: Option<u64>,
    /// Instances destroyed on the forced path
    pub destroyed_instances: Vec<u64>,
    pub failed: Vec<(String, OperationError)>,
}

impl DestroyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.machines.is_success()
    }
}

pub struct DestroyEnvironment<'a> {
    ctx: &'a CommandContext,
    force: bool,
}

impl<'a> DestroyEnvironment<'a> {
    pub fn new(ctx: &'a CommandContext, force: bool) -> Self {
        Self { ctx, force }
    }

    pub async fn run(&self) -> Result<DestroyReport> {
        self.ctx.check_preconditions().await?;
        if self.force {
            self.force_destroy().await
        } else {
            self.destroy().await
        }
    }

    async fn destroy(&self) -> Result<DestroyReport> {
        // the manual provider needs machines removed before the environment
        let (view, machines) =
            terminate_machines(self.ctx, |id| id != STATE_SERVER_MACHINE).await?;

        // machines are marked dead asynchronously
        if !self.ctx.config.settle_delay.is_zero() {
            tokio::time::sleep(self.ctx.config.settle_delay).await;
        }

        info!("Destroying environment");
        self.ctx.env.destroy_environment().await?;

        let mut report = DestroyReport {
            machines,
            ..Default::default()
        };
        if let Some(instance) = view.instance_for_machine(STATE_SERVER_MACHINE) {
            info!("Terminating state server");
            self.ctx.provider.destroy_instance(instance.id).await?;
            report.state_server = Some(instance.id);
        } else {
            warn!("Couldn't resolve state server to an instance");
        }

        info!("Environment Destroyed");
        Ok(report)
    }

    async fn force_destroy(&self) -> Result<DestroyReport> {
        let instances = self.ctx.provider.list_instances().await?;

        info!("Destroying environment");
        let mut runner = self.ctx.runner();
        for instance in instances
            .into_iter()
            .filter(|i| i.belongs_to(self.ctx.env_name()))
        {
            runner.queue(MachineDestroy::new(
                Arc::clone(&self.ctx.provider),
                Arc::clone(&self.ctx.env),
                None,
                Some(instance.id),
                DestroyMode::ProviderOnly,
            ));
        }

        let mut report = DestroyReport::default();
        let mut results = runner.iter_results();
        while let Some(completed) = results.next().await {
            match completed.result {
                Ok(_) => {
                    if let Operation::Destroy(op) = &completed.operation {
                        report.destroyed_instances.extend(op.instance_id());
                    }
                }
                Err(e) => {
                    let label = completed.operation.describe();
                    error!("Failed to {}: {}", label, e);
                    report.failed.push((label, e));
                }
            }
        }
        report.destroyed_instances.sort_unstable();

        // drop the client cache instead of talking to the state server
        self.ctx.env.destroy_environment_jenv().await?;
        info!("Environment Destroyed");
        Ok(report)
    }
}
