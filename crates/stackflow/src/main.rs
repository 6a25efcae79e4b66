mod plugins;

use clap::{Parser, Subcommand};
use colored::Colorize;
use stackflow_aws::{
    CloudFormationClient, CommandContext, DeploySettings, MonitorSettings, RetryConfig,
};
use stackflow_config::Settings;
use stackflow_lifecycle::{CancellationFlag, Dispatcher, Options};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackflow")]
#[command(about = "Deploy serverless services as CloudFormation stacks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Stage to work on (defaults to the provider's stage, then "dev")
    #[arg(short, long, global = true, env = "STACKFLOW_STAGE")]
    stage: Option<String>,

    /// Region to work in (defaults to the provider's region, then "us-east-1")
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Path to the service file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the service into CloudFormation templates under .stackflow/
    Package,
    /// Package the service and deploy it
    Deploy,
    /// Remove the deployed stack
    Remove,
    /// Show the deployed stack and its outputs
    Info,
    /// Print the compiled template
    Print {
        /// Output format
        #[arg(short, long, default_value = "json", value_parser = ["json", "yaml"])]
        format: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Package => "package",
            Commands::Deploy => "deploy",
            Commands::Remove => "remove",
            Commands::Info => "info",
            Commands::Print { .. } => "print",
        }
    }

    /// Whether the command talks to the provider
    fn is_remote(&self) -> bool {
        matches!(self, Commands::Deploy | Commands::Remove | Commands::Info)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn deploy_settings(settings: &Settings) -> DeploySettings {
    DeploySettings {
        monitor: MonitorSettings {
            poll_interval: settings.monitor_frequency(),
            timeout: settings.monitor_timeout(),
            query_retries: settings.request_retries,
        },
        retry: RetryConfig::fixed(settings.request_retries, settings.request_retry_delay()),
    }
}

fn invocation_options(cli: &Cli) -> Options {
    let mut options = Options::new();
    if let Some(stage) = &cli.stage {
        options.insert("stage".to_string(), stage.clone());
    }
    if let Some(region) = &cli.region {
        options.insert("region".to_string(), region.clone());
    }
    if let Commands::Print { format } = &cli.command {
        options.insert("format".to_string(), format.clone());
    }
    options
}

fn service_file(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) if path.exists() => Ok(path.clone()),
        Some(path) => anyhow::bail!("service file {} does not exist", path.display()),
        None => Ok(stackflow_config::find_service_file()?),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let path = service_file(&cli)?;
    let service = stackflow_config::load_service(&path)?;
    let service_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let settings = Settings::load()?;
    let command = cli.command.name();

    let cancel = CancellationFlag::new();
    let registry = plugins::registry(&service.provider.name, command)?;
    let dispatcher = Dispatcher::new(registry).with_cancellation(cancel.clone());

    let mut ctx = CommandContext::new(service, &service_dir)
        .with_options(invocation_options(&cli))
        .with_settings(deploy_settings(&settings))
        .with_cancellation(cancel.clone());

    if cli.command.is_remote() {
        let client = CloudFormationClient::connect(&ctx.region()).await;
        ctx = ctx.with_client(Arc::new(client));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling after the current step...".yellow());
            cancel.cancel();
        }
    });

    tracing::info!(command, service = %ctx.service.service, stage = %ctx.stage(), "running");
    dispatcher.run(command, &mut ctx).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{}", "✗ Error".red().bold());
        eprintln!("  {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
