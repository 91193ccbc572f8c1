//! AddMachine: launch instances and register them with the environment

use futures_util::StreamExt;
use juju_docean_cloud::Instance;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::CommandContext;
use crate::error::{OperationError, Result};
use crate::operation::{MachineRegister, OperationOutput};

/// A machine that did not make it into the environment
#[derive(Debug)]
pub struct FailedAdd {
    pub name: String,
    pub error: OperationError,
    /// The orphaned instance was destroyed again
    pub cleaned_up: bool,
}

#[derive(Debug, Default)]
pub struct AddReport {
    /// Registered instances with their machine ids
    pub registered: Vec<(Instance, String)>,
    pub failed: Vec<FailedAdd>,
}

impl AddReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct AddMachine<'a> {
    ctx: &'a CommandContext,
    count: usize,
    ssh_key: Option<String>,
}

impl<'a> AddMachine<'a> {
    pub fn new(ctx: &'a CommandContext, count: usize) -> Self {
        Self {
            ctx,
            count,
            ssh_key: None,
        }
    }

    /// Private key juju should use to reach the new machines
    pub fn with_ssh_key(mut self, ssh_key: Option<String>) -> Self {
        self.ssh_key = ssh_key;
        self
    }

    pub async fn run(&self) -> Result<AddReport> {
        let keys = self.ctx.check_preconditions().await?;
        let resolved = self.ctx.solve_constraints().await?;
        info!("Launching {} instances...", self.count);

        let mut runner = self.ctx.runner();
        for _ in 0..self.count {
            let name = format!("{}-{}", self.ctx.env_name(), Uuid::new_v4().simple());
            let spec = self.ctx.instance_spec(name, &resolved, &keys);
            let op = MachineRegister::new(
                self.ctx.machine_add(spec),
                Arc::clone(&self.ctx.env),
                self.ctx.config.registration_wait,
            )
            .with_ssh_key(self.ssh_key.clone());
            runner.queue(op);
        }

        let mut report = AddReport::default();
        let mut results = runner.iter_results();
        while let Some(completed) = results.next().await {
            match completed.result {
                Ok(OperationOutput::Registered {
                    instance,
                    machine_id,
                }) => {
                    info!(
                        "Registered id:{} name:{} ip:{} as juju machine {}",
                        instance.id,
                        instance.name,
                        instance.address().unwrap_or_default(),
                        machine_id
                    );
                    report.registered.push((instance, machine_id));
                }
                Ok(other) => {
                    warn!("Unexpected outcome {:?}", other);
                }
                Err(e) => {
                    let name = completed.operation.describe();
                    error!("Failed to {}: {}", name, e);
                    let cleaned_up = self.clean_up(&e).await;
                    report.failed.push(FailedAdd {
                        name,
                        error: e,
                        cleaned_up,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Destroy an instance the environment refused. Timed-out instances
    /// are only reported; they may still come up.
    async fn clean_up(&self, e: &OperationError) -> bool {
        match e {
            OperationError::Registration { instance, .. } => {
                info!("Destroying unregistered instance {}", instance.id);
                match self.ctx.provider.destroy_instance(instance.id).await {
                    Ok(_) => true,
                    Err(cleanup) => {
                        warn!(
                            "Could not destroy orphaned instance id:{} ip:{}: {}",
                            instance.id,
                            instance.address().unwrap_or_default(),
                            cleanup
                        );
                        false
                    }
                }
            }
            other => {
                if let Some(id) = other.orphaned_instance() {
                    warn!("Instance {} may be orphaned", id);
                }
                false
            }
        }
    }
}
