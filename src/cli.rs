//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use stackform::output::OutputConfig;

use crate::commands;

/// Stackform - provision clusters and install kapps from declarative YAML
#[derive(Parser, Debug)]
#[command(name = "stackform")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Work with clusters
    #[command(subcommand)]
    Cluster(commands::cluster::ClusterCommands),

    /// Work with kapps
    #[command(subcommand)]
    Kapps(commands::kapps::KappsCommands),

    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .init();

        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Cluster(command) => commands::cluster::execute(command, &output),
            Commands::Kapps(command) => commands::kapps::execute(command, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
