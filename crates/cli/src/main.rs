//! IPLB CLI - Main Entry Point
//!
//! Drives the IPLB provider from the command line to create, inspect,
//! update and delete HTTP farms.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use iplb_common::ClientConfig;
use iplb_provider::IplbProvider;

mod commands;
mod output;

use commands::{farm, validate};

/// IPLB CLI - IP Load Balancing HTTP farm management
#[derive(Parser)]
#[command(name = "iplb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to ~/.iplb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage HTTP farms
    #[command(subcommand)]
    Farm(farm::FarmCommands),

    /// Validate a farm configuration file without calling the API
    Validate(validate::ValidateArgs),

    /// Print the provider and resource schemas
    Schema,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let provider = IplbProvider::new();

    match cli.command {
        Commands::Farm(cmd) => {
            let path = cli.config.unwrap_or_else(iplb_common::default_config_path);
            debug!("Loading configuration from {}", path.display());
            let config = ClientConfig::load(&path)?.with_env();

            let diagnostics = provider.configure_with(config).await;
            if output::print_diagnostics(&diagnostics) {
                anyhow::bail!("provider configuration failed");
            }
            farm::execute(cmd, &provider, cli.format).await?;
        }
        Commands::Validate(args) => validate::execute(args, &provider)?,
        Commands::Schema => output::print_value(&provider.get_provider_schema(), cli.format),
        Commands::Version => {
            println!("IPLB CLI v{}", iplb_common::VERSION);
            println!("Resources: {}", provider.resource_types().join(", "));
        }
    }

    Ok(())
}
