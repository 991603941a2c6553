//! PortKeeper CLI - Keep one server instance on a fixed port
//!
//! Stands in for the graphical front-end: `serve` supervises the managed
//! server and takes commands on stdin, the other subcommands are one-shot.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::Overrides;

#[derive(Parser)]
#[command(name = "portkeeper")]
#[command(author, version, about = "Keep a single kdb+ server running on a fixed port")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Port to supervise (overrides the config file)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Managed executable (overrides the config file)
    #[arg(long, global = true)]
    executable: Option<String>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Force start the server and read commands from stdin (default)
    Serve,

    /// Show whether something listens on the port
    Status,

    /// Check that the managed executable is installed
    Check,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key as written in the file, e.g. `port` or `launchWindowMs`
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portkeeper=info,portkeeper_core=info,managed=info"));

    // stdout carries command replies only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let store = commands::config_store(cli.config)?;
    let overrides = Overrides {
        port: cli.port,
        executable: cli.executable,
    };

    let success = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::run(&store, &overrides, cli.json).await?,
        Commands::Status => commands::status::run(&store, &overrides, cli.json).await?,
        Commands::Check => commands::check::run(&store, &overrides, cli.json).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&store, &overrides, cli.json).await?,
            ConfigAction::Set { key, value } => {
                commands::config::set(&store, &key, &value, cli.json).await?
            }
            ConfigAction::Path => commands::config::path(&store, cli.json)?,
        },
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
