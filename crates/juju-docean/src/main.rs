mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use juju_docean_api::DigitalOceanClient;
use juju_docean_config::{Config, Credentials, DEFAULT_SERIES, DEFAULT_WORKERS, default_juju_home};
use juju_docean_core::CommandContext;
use juju_docean_core::constraints::series_names;
use juju_docean_env::JujuCli;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "juju-docean")]
#[command(version)]
#[command(
    about = "Juju on DigitalOcean: provision machines for a manual-provider environment",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(clap::Args)]
struct GlobalArgs {
    /// Juju environment to operate on
    #[arg(short = 'e', long, env = "JUJU_ENV", global = true)]
    environment: Option<String>,

    /// Juju client home (defaults to ~/.juju)
    #[arg(long, env = "JUJU_HOME", global = true)]
    juju_home: Option<PathBuf>,

    /// DigitalOcean client id
    #[arg(long, env = "DO_CLIENT_ID", global = true, hide_env_values = true)]
    client_id: Option<String>,

    /// DigitalOcean api key
    #[arg(long, env = "DO_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Ubuntu series for new machines
    #[arg(long, default_value = DEFAULT_SERIES, global = true)]
    series: String,

    /// Machine constraints, e.g. "mem=2G region=nyc3"
    #[arg(long, default_value = "", global = true)]
    constraints: String,

    /// Upload local juju tools when bootstrapping
    #[arg(long, global = true)]
    upload_tools: bool,

    /// Maximum concurrent machine operations
    #[arg(long, default_value_t = DEFAULT_WORKERS, global = true)]
    workers: usize,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a state server and bootstrap the environment on it
    Bootstrap,
    /// List DigitalOcean machines of the environment
    #[command(name = "list-machines")]
    ListMachines {
        /// Include machines of every environment
        #[arg(short, long)]
        all: bool,
        /// Also report machines and instances that do not match up
        #[arg(long)]
        drift: bool,
    },
    /// Launch machines and add them to the environment
    #[command(name = "add-machine")]
    AddMachine {
        /// Number of machines to add
        #[arg(default_value_t = 1)]
        count: usize,
        /// Private key juju should use to reach the machines
        #[arg(long)]
        ssh_key: Option<String>,
    },
    /// Remove machines from the environment and destroy them
    #[command(name = "terminate-machine")]
    TerminateMachine {
        /// Juju machine ids
        #[arg(required = true)]
        machines: Vec<String>,
    },
    /// Destroy every machine and the environment itself
    #[command(name = "destroy-environment")]
    DestroyEnvironment {
        /// Destroy the instances and the local environment cache without
        /// talking to the state server
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_config(args: &GlobalArgs) -> anyhow::Result<Config> {
    let credentials = Credentials::from_parts(args.client_id.clone(), args.api_key.clone())?;
    let juju_home = match &args.juju_home {
        Some(home) => home.clone(),
        None => default_juju_home()?,
    };

    let mut config = Config::new(
        args.environment.clone().unwrap_or_default(),
        juju_home,
        credentials,
    );
    config.series = args.series.clone();
    config.constraints = args.constraints.clone();
    config.upload_tools = args.upload_tools;
    config.verbose = args.verbose;
    config.workers = args.workers;
    config.validate()?;
    Ok(config)
}

fn build_context(config: Config) -> anyhow::Result<CommandContext> {
    let provider = DigitalOceanClient::new(
        config.credentials.client_id.clone(),
        config.credentials.api_key.clone(),
    )
    .context("Failed to build the DigitalOcean client")?;
    let mut juju = JujuCli::new(config.env_name.clone(), config.juju_home.clone());
    if config.upload_tools {
        juju = juju.with_upload_tools(series_names());
    }
    Ok(CommandContext::new(
        Arc::new(config),
        Arc::new(provider),
        Arc::new(juju),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let config = build_config(&cli.global).context("Invalid configuration")?;
    tracing::debug!("Using environment {} in {}", config.env_name, config.juju_home.display());
    let ctx = build_context(config)?;

    match cli.command {
        Commands::Bootstrap => commands::bootstrap::handle(&ctx).await,
        Commands::ListMachines { all, drift } => commands::list::handle(&ctx, all, drift).await,
        Commands::AddMachine { count, ssh_key } => {
            commands::add_machine::handle(&ctx, count, ssh_key).await
        }
        Commands::TerminateMachine { machines } => {
            commands::terminate::handle(&ctx, machines).await
        }
        Commands::DestroyEnvironment { force } => commands::destroy::handle(&ctx, force).await,
    }
}
