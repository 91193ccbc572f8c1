//! Reconciliation between environment machines and provider instances
//!
//! The join key is the machine's address. The environment's own
//! `instance-id` is not trusted: under the manual provider it usually holds
//! `manual:<ip>` rather than a provider id.

use juju_docean_cloud::{CloudProvider, Instance};
use juju_docean_env::{Environment, EnvironmentStatus, MachineRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;
use crate::operation::{DestroyMode, MachineDestroy};

/// One machine paired with the instance at its address, if any
#[derive(Debug, Clone, PartialEq)]
pub struct AddressJoin {
    pub machine: MachineRecord,
    pub instance: Option<Instance>,
}

/// Planned destroy for one machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyDirective {
    pub machine_id: String,
    pub address: Option<String>,
    pub instance_id: Option<u64>,
    pub mode: DestroyMode,
}

impl DestroyDirective {
    pub fn is_env_only(&self) -> bool {
        self.mode == DestroyMode::EnvironmentOnly
    }

    pub fn into_operation(
        self,
        provider: Arc<dyn CloudProvider>,
        env: Arc<dyn Environment>,
    ) -> MachineDestroy {
        MachineDestroy::new(
            provider,
            env,
            Some(self.machine_id),
            self.instance_id,
            self.mode,
        )
    }
}

/// Disagreement between the two sides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drift {
    /// Known to the environment, no live instance at that address
    pub machines_without_instance: Vec<MachineRecord>,
    /// Environment instances no machine points at
    pub instances_without_machine: Vec<Instance>,
}

impl Drift {
    pub fn is_empty(&self) -> bool {
        self.machines_without_instance.is_empty() && self.instances_without_machine.is_empty()
    }
}

/// Snapshot of both sides, built fresh for each pass
#[derive(Debug, Clone)]
pub struct ReconciliationView {
    status: EnvironmentStatus,
    instances: Vec<Instance>,
}

impl ReconciliationView {
    pub fn new(status: EnvironmentStatus, instances: Vec<Instance>) -> Self {
        Self { status, instances }
    }

    /// Query the environment status and the provider's instance list
    pub async fn fetch(provider: &dyn CloudProvider, env: &dyn Environment) -> Result<Self> {
        let status = env.status().await?;
        let instances = provider.list_instances().await?;
        Ok(Self::new(status, instances))
    }

    pub fn status(&self) -> &EnvironmentStatus {
        &self.status
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    fn address_map(&self) -> HashMap<&str, &Instance> {
        self.instances
            .iter()
            .filter_map(|i| i.address().map(|addr| (addr, i)))
            .collect()
    }

    pub fn instance_for_address(&self, address: &str) -> Option<&Instance> {
        self.instances
            .iter()
            .find(|i| i.address() == Some(address))
    }

    /// Instance backing `machine_id`, resolved by address
    pub fn instance_for_machine(&self, machine_id: &str) -> Option<&Instance> {
        let address = self.status.machine(machine_id)?.dns_name.as_deref()?;
        self.instance_for_address(address)
    }

    /// Every machine joined to its instance
    pub fn join(&self) -> Vec<AddressJoin> {
        let by_address = self.address_map();
        self.status
            .records()
            .into_iter()
            .map(|machine| {
                let instance = machine
                    .dns_name
                    .as_deref()
                    .and_then(|addr| by_address.get(addr))
                    .map(|i| (*i).clone());
                AddressJoin { machine, instance }
            })
            .collect()
    }

    /// Destroy directives for the machines selected by `filter`.
    ///
    /// A machine whose address matches no instance still gets an
    /// environment-only directive so its record is cleaned up.
    pub fn destroy_directives<F>(&self, filter: F) -> Vec<DestroyDirective>
    where
        F: Fn(&str) -> bool,
    {
        self.join()
            .into_iter()
            .filter(|j| filter(&j.machine.machine_id))
            .map(|AddressJoin { machine, instance }| match instance {
                Some(instance) => DestroyDirective {
                    machine_id: machine.machine_id,
                    address: machine.dns_name,
                    instance_id: Some(instance.id),
                    mode: DestroyMode::Full,
                },
                None => {
                    warn!(
                        "Couldn't resolve machine {}'s address {} to instance",
                        machine.machine_id,
                        machine.dns_name.as_deref().unwrap_or("<none>")
                    );
                    DestroyDirective {
                        machine_id: machine.machine_id,
                        address: machine.dns_name,
                        instance_id: None,
                        mode: DestroyMode::EnvironmentOnly,
                    }
                }
            })
            .collect()
    }

    /// Drift between the environment and the instances named for `env_name`
    pub fn drift(&self, env_name: &str) -> Drift {
        let joins = self.join();
        let claimed: HashSet<&str> = self
            .status
            .machines
            .values()
            .filter_map(|m| m.dns_name.as_deref())
            .collect();

        Drift {
            machines_without_instance: joins
                .into_iter()
                .filter(|j| j.instance.is_none())
                .map(|j| j.machine)
                .collect(),
            instances_without_machine: self
                .instances
                .iter()
                .filter(|i| i.belongs_to(env_name))
                .filter(|i| i.address().is_none_or(|addr| !claimed.contains(addr)))
                .cloned()
                .collect(),
        }
    }
}
