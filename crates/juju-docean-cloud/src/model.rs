//! Provider-owned entities
//!
//! Every entity is an immutable snapshot of what the provider reported. The
//! orchestration layer never mutates an [`Instance`] in place; it re-fetches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the provider for an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    /// Accepted by the provider, still being provisioned
    New,
    /// Booted and reachable
    Active,
    /// Powered off
    Off,
    /// Archived (destroyed, retained by the provider)
    Archive,
    /// Any status this layer does not interpret
    Other(String),
}

impl InstanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InstanceStatus::New => "new",
            InstanceStatus::Active => "active",
            InstanceStatus::Off => "off",
            InstanceStatus::Archive => "archive",
            InstanceStatus::Other(s) => s,
        }
    }
}

impl From<&str> for InstanceStatus {
    fn from(value: &str) -> Self {
        match value {
            "new" => InstanceStatus::New,
            "active" => InstanceStatus::Active,
            "off" => InstanceStatus::Off,
            "archive" => InstanceStatus::Archive,
            other => InstanceStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for InstanceStatus {
    fn from(value: String) -> Self {
        InstanceStatus::from(value.as_str())
    }
}

impl From<InstanceStatus> for String {
    fn from(value: InstanceStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute instance on the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: u64,
    pub name: String,
    pub size_id: u64,
    pub image_id: u64,
    pub region_id: u64,
    pub status: InstanceStatus,
    /// Public address. The initial create response carries none.
    pub ip_address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Instance {
    /// Non-empty public address, if the provider has assigned one
    pub fn address(&self) -> Option<&str> {
        self.ip_address.as_deref().filter(|ip| !ip.trim().is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.status == InstanceStatus::Active
    }

    /// Running with an address: the state MachineAdd waits for
    pub fn is_ready(&self) -> bool {
        self.is_active() && self.address().is_some()
    }

    /// Whether this instance belongs to the named environment (`<env>-*`)
    pub fn belongs_to(&self, env_name: &str) -> bool {
        self.name
            .strip_prefix(env_name)
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

/// Parameters for creating an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub name: String,
    pub size_id: u64,
    pub image_id: u64,
    pub region_id: u64,
    pub ssh_key_ids: Vec<u64>,
    pub private_networking: bool,
    pub backups_enabled: bool,
}

impl InstanceSpec {
    pub fn new(
        name: impl Into<String>,
        image_id: u64,
        size_id: u64,
        region_id: u64,
        ssh_key_ids: Vec<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            size_id,
            image_id,
            region_id,
            ssh_key_ids,
            private_networking: false,
            backups_enabled: false,
        }
    }
}

/// Machine image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub name: String,
    pub slug: Option<String>,
    pub distribution: String,
    pub public: bool,
}

/// Provider region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

/// SSH public key registered with the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
}
