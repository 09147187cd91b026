// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "relink")]
#[command(about = "Symlink-based release updates, rollbacks, and syncs over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Target destination (defined in config)
    #[arg(short, long, global = true)]
    pub destination: Option<String>,

    /// Don't open URLs after restarting a server
    #[arg(long, global = true)]
    pub no_open: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new relink.yml configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Stage, update, and switch to a new release
    Update {
        /// Targets to update, e.g. -t "core modules"
        #[arg(short, long)]
        targets: Vec<String>,
    },

    /// Switch back to the release before the current one
    Rollback,

    /// Reset live targets to their remote branch in place
    Sync {
        /// Targets to sync, e.g. -t "api web"
        #[arg(short, long)]
        targets: Vec<String>,

        /// Skip the branch check and check the branch out
        #[arg(short, long)]
        force: bool,
    },

    /// Show pointers and releases on every server
    Status,

    /// Remove old releases
    Prune {
        /// Number of newest releases to keep (defaults to keep_releases)
        #[arg(long)]
        keep: Option<usize>,
    },

    /// Show the tail of the application log
    Log {
        /// Number of lines
        #[arg(short = 'n', long, default_value_t = 100)]
        lines: usize,
    },
}
