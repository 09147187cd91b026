// ABOUTME: Entry point for the relink CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Operator;
use relink::config::{self, Config};
use relink::error::Result;
use relink::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);
    let operator = Operator::new(cli.yes, cli.no_open);
    let cwd = env::current_dir()?;

    if let Commands::Init { force } = cli.command {
        config::init_config(&cwd, force)?;
        output.success("Created relink.yml");
        return Ok(());
    }

    let config = Config::discover(&cwd)?;
    // Apply destination overrides if specified
    let config = match &cli.destination {
        Some(dest) => config.for_destination(dest)?,
        None => config,
    };

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Update { targets } => commands::update(config, targets, &operator, output).await,
        Commands::Rollback => commands::rollback(config, &operator, output).await,
        Commands::Sync { targets, force } => {
            commands::sync(config, targets, force, &operator, output).await
        }
        Commands::Status => commands::status(config, output).await,
        Commands::Prune { keep } => commands::prune(config, keep, &operator, output).await,
        Commands::Log { lines } => commands::log(config, lines, output).await,
    }
}
