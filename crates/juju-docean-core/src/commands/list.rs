//! ListMachines: tabulate provider instances, optionally with drift

use juju_docean_cloud::Instance;

use super::CommandContext;
use crate::constraints::{region_by_id, size_by_id};
use crate::error::Result;
use crate::reconcile::{Drift, ReconciliationView};

const NAME_WIDTH: usize = 18;

/// One printable instance row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRow {
    pub id: u64,
    pub name: String,
    pub size: String,
    pub status: String,
    pub created: String,
    pub region: String,
    pub address: String,
}

impl MachineRow {
    pub fn from_instance(instance: &Instance) -> Self {
        Self {
            id: instance.id,
            name: truncate_name(&instance.name),
            size: size_by_id(instance.size_id)
                .map(|s| s.name.to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            status: instance.status.to_string(),
            created: instance
                .created_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            region: region_by_id(instance.region_id)
                .map(|r| r.slug().to_string())
                .unwrap_or_else(|| instance.region_id.to_string()),
            address: instance.address().unwrap_or_default().to_string(),
        }
    }
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > NAME_WIDTH {
        let head: String = name.chars().take(NAME_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MachineTable {
    pub rows: Vec<MachineRow>,
    /// Present when drift was requested
    pub drift: Option<Drift>,
}

pub struct ListMachines<'a> {
    ctx: &'a CommandContext,
    all: bool,
    drift: bool,
}

impl<'a> ListMachines<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self {
            ctx,
            all: false,
            drift: false,
        }
    }

    /// Include instances of other environments
    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    pub fn with_drift(mut self, drift: bool) -> Self {
        self.drift = drift;
        self
    }

    pub async fn run(&self) -> Result<MachineTable> {
        let env_name = self.ctx.env_name();
        let instances = self.ctx.provider.list_instances().await?;

        let rows = instances
            .iter()
            .filter(|i| self.all || i.belongs_to(env_name))
            .map(MachineRow::from_instance)
            .collect();

        let drift = if self.drift {
            let status = self.ctx.env.status().await?;
            Some(ReconciliationView::new(status, instances).drift(env_name))
        } else {
            None
        };

        Ok(MachineTable { rows, drift })
    }
}
