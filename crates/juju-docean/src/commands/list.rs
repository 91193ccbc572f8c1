use colored::Colorize;
use juju_docean_core::CommandContext;
use juju_docean_core::commands::{ListMachines, MachineRow};

fn format_row(row: &MachineRow) -> String {
    format!(
        "{:<8} {:<18} {:<5} {:<8} {:<12} {:<6} {:<10}",
        row.id, row.name, row.size, row.status, row.created, row.region, row.address
    )
    .trim_end()
    .to_string()
}

pub async fn handle(ctx: &CommandContext, all: bool, drift: bool) -> anyhow::Result<()> {
    let table = ListMachines::new(ctx)
        .with_all(all)
        .with_drift(drift)
        .run()
        .await?;

    if table.rows.is_empty() {
        println!("{}", "No machines".dimmed());
    } else {
        println!(
            "{}",
            format!(
                "{:<8} {:<18} {:<5} {:<8} {:<12} {:<6} {:<10}",
                "Id", "Name", "Size", "Status", "Created", "Region", "Address"
            )
            .bold()
        );
        for row in &table.rows {
            println!("{}", format_row(row));
        }
    }

    if let Some(drift) = table.drift {
        println!();
        if drift.is_empty() {
            println!("{}", "No drift".green());
        }
        for machine in &drift.machines_without_instance {
            println!(
                "{} machine {} ({}) has no instance",
                "!".yellow(),
                machine.machine_id.bold(),
                machine.dns_name.as_deref().unwrap_or("no address")
            );
        }
        for instance in &drift.instances_without_machine {
            println!(
                "{} instance {} ({}) is not a juju machine",
                "!".yellow(),
                instance.name.bold(),
                instance.address().unwrap_or("no address")
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_row_trims_trailing_space() {
        let row = MachineRow {
            id: 1234,
            name: "prod-0".to_string(),
            size: "512MB".to_string(),
            status: "active".to_string(),
            created: "2014-05-01".to_string(),
            region: "nyc3".to_string(),
            address: String::new(),
        };
        let line = format_row(&row);
        assert!(line.starts_with("1234     prod-0"));
        assert!(line.ends_with("nyc3"));
    }
}
