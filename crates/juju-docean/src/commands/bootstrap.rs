use colored::Colorize;
use juju_docean_core::CommandContext;
use juju_docean_core::commands::Bootstrap;

pub async fn handle(ctx: &CommandContext) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("Bootstrapping environment {}...", ctx.env_name()).blue()
    );

    let instance = Bootstrap::new(ctx).run().await?;

    println!(
        "{} State server {} ({}) at {}",
        "✓".green(),
        instance.name.cyan(),
        instance.id,
        instance.address().unwrap_or_default()
    );
    Ok(())
}
