use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "prepxp")]
#[command(about = "XP progression engine for competition-math practice")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.prepxp/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ~/.prepxp/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show current level, XP, and streak
    Status,

    /// Apply an XP gain and save it remotely
    Award {
        /// XP amount to award
        amount: u64,

        /// Source tag recorded with the gain
        #[arg(long, default_value = "manual")]
        source: String,
    },

    /// Flush a rescued emergency snapshot to the remote store
    Recover,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::Init { force } => {
            cli::init::init_command(force)?;
        }
        Commands::Status => {
            cli::status::status_command(cli.config.as_deref()).await?;
        }
        Commands::Award { amount, source } => {
            cli::award::award_command(cli.config.as_deref(), amount, &source).await?;
        }
        Commands::Recover => {
            cli::recover::recover_command(cli.config.as_deref()).await?;
        }
    }

    Ok(())
}
