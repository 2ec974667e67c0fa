use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "retrosync", version, about = "Sync RetroPie ROMs, saves and states with remote storage")]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON). Defaults to the platform config directory.
    #[arg(short, long, global = true, env = "RETROSYNC_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one sync pass over the configured ROM folder
    Sync,
    /// Inspect or generate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Load the configuration and report whether it is usable
    Validate,
    /// Write config.example.yaml into a directory
    Example {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}
