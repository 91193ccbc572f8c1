use colored::Colorize;
use juju_docean_core::CommandContext;
use juju_docean_core::commands::AddMachine;

use super::print_failures;

pub async fn handle(
    ctx: &CommandContext,
    count: usize,
    ssh_key: Option<String>,
) -> anyhow::Result<()> {
    if count == 0 {
        anyhow::bail!("Machine count must be at least 1");
    }

    let report = AddMachine::new(ctx, count)
        .with_ssh_key(ssh_key)
        .run()
        .await?;

    for (instance, machine_id) in &report.registered {
        println!(
            "{} machine {} ← {} ({}) {}",
            "✓".green(),
            machine_id.bold(),
            instance.name.cyan(),
            instance.id,
            instance.address().unwrap_or_default()
        );
    }
    print_failures(report.failed.iter().map(|f| (f.name.as_str(), &f.error)));
    for failed in report.failed.iter().filter(|f| f.cleaned_up) {
        println!("  {} cleaned up after {}", "-".dimmed(), failed.name);
    }

    println!(
        "{} of {} machines added",
        report.registered.len().to_string().bold(),
        count
    );
    Ok(())
}
