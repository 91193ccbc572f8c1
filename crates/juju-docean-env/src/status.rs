//! `juju status` snapshot

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parsed output of `juju status --format yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentStatus {
    #[serde(default)]
    pub environment: Option<String>,

    /// Machines keyed by machine id ("0" is the state server)
    #[serde(default)]
    pub machines: BTreeMap<String, MachineStatus>,
}

/// Per-machine entry of the status snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineStatus {
    #[serde(rename = "dns-name", default)]
    pub dns_name: Option<String>,

    /// Advisory only: with the manual provider this is often `manual:<ip>`
    /// rather than a provider instance id.
    #[serde(rename = "instance-id", default)]
    pub instance_id: Option<String>,

    #[serde(rename = "agent-state", default)]
    pub agent_state: Option<String>,

    #[serde(default)]
    pub series: Option<String>,
}

/// Flattened control-plane record for one machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRecord {
    pub machine_id: String,
    pub dns_name: Option<String>,
    pub instance_id: Option<String>,
}

impl EnvironmentStatus {
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// All machines as flat records, in machine id order
    pub fn records(&self) -> Vec<MachineRecord> {
        self.machines
            .iter()
            .map(|(id, m)| MachineRecord {
                machine_id: id.clone(),
                dns_name: m.dns_name.clone(),
                instance_id: m.instance_id.clone(),
            })
            .collect()
    }

    pub fn machine(&self, machine_id: &str) -> Option<&MachineStatus> {
        self.machines.get(machine_id)
    }

    /// Id of the machine registered under `address`, if any
    pub fn machine_id_for_address(&self, address: &str) -> Option<&str> {
        self.machines
            .iter()
            .find(|(_, m)| m.dns_name.as_deref() == Some(address))
            .map(|(id, _)| id.as_str())
    }
}
