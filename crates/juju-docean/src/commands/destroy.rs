use colored::Colorize;
use juju_docean_core::CommandContext;
use juju_docean_core::commands::DestroyEnvironment;

use super::print_failures;

pub async fn handle(ctx: &CommandContext, force: bool) -> anyhow::Result<()> {
    let report = DestroyEnvironment::new(ctx, force).run().await?;

    if force {
        for id in &report.destroyed_instances {
            println!("{} instance {}", "✓".green(), id);
        }
    } else {
        println!(
            "{} {} machines terminated",
            "✓".green(),
            report.machines.destroyed.len()
        );
        if let Some(id) = report.state_server {
            println!("{} state server instance {}", "✓".green(), id);
        }
    }

    print_failures(
        report
            .machines
            .failed
            .iter()
            .chain(report.failed.iter())
            .map(|(label, e)| (label.as_str(), e)),
    );
    println!(
        "{}",
        format!("Environment {} destroyed", ctx.env_name()).green()
    );
    Ok(())
}
