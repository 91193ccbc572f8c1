use colored::Colorize;
use juju_docean_core::CommandContext;
use juju_docean_core::commands::TerminateMachine;

use super::print_failures;

pub async fn handle(ctx: &CommandContext, machines: Vec<String>) -> anyhow::Result<()> {
    let report = TerminateMachine::new(ctx, machines).run().await?;

    for id in &report.unknown {
        println!("{} machine {} not found", "?".yellow(), id);
    }
    for outcome in &report.destroyed {
        let machine = outcome.machine_id.as_deref().unwrap_or("-");
        match outcome.instance_id {
            Some(id) if outcome.instance_destroyed => {
                println!("{} machine {} (instance {})", "✓".green(), machine.bold(), id)
            }
            _ => println!(
                "{} machine {} removed from environment only",
                "✓".green(),
                machine.bold()
            ),
        }
    }
    print_failures(report.failed.iter().map(|(label, e)| (label.as_str(), e)));
    Ok(())
}
