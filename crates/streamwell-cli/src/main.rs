//! `swell` -- CLI binary for the streamwell streaming client.
//!
//! Provides the following subcommands:
//!
//! - `swell chat` -- Stream a reply to one message.
//! - `swell resume` -- Continue a suspended or interrupted reply.
//! - `swell health` -- Show provider health.
//! - `swell config` -- Show resolved configuration.

use clap::{Parser, Subcommand};

mod commands;
mod render;

/// streamwell streaming chat CLI.
#[derive(Parser)]
#[command(name = "swell", about = "streamwell streaming chat CLI", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Stream a reply to a single message.
    Chat(commands::chat::ChatArgs),

    /// Continue a saved reply.
    Resume(commands::chat::ResumeArgs),

    /// Show provider health.
    Health(commands::health::HealthArgs),

    /// Show resolved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

/// Subcommands for `swell config`.
#[derive(Subcommand)]
enum ConfigCmd {
    /// Print the resolved configuration with credentials redacted.
    Show {
        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat(args) => commands::chat::run(args).await?,
        Commands::Resume(args) => commands::chat::resume(args).await?,
        Commands::Health(args) => commands::health::run(args).await?,
        Commands::Config { action } => match action {
            ConfigCmd::Show { config } => commands::config_cmd::show(config.as_deref()).await?,
        },
    }

    Ok(())
}
