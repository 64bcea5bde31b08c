//! Command-line interface for hostkeep.
//!
//! Each subcommand lives in its own module with an `Args`/`Subcommand`
//! structure and an `execute` method that receives the loaded
//! [`HostConfig`](crate::config::HostConfig).
//!
//! # Commands
//!
//! - `status` - installed versions, server state and maintenance flag
//! - `check [engine|plugin]` - compare installed versions with upstream
//! - `update <kind> [--url] [--yes]` - run an update session
//! - `mod install|remove|status` - manage third-party packages
//! - `server start|stop` - control the server process
//! - `init` - write a default configuration file
//!
//! # Global Options
//!
//! - `--verbose` - debug logging
//! - `--quiet` - errors only
//! - `--config` - path to the configuration file
//!
//! ```bash
//! hostkeep check
//! hostkeep update engine --yes
//! hostkeep mod install 1234
//! hostkeep --config ./host.toml status
//! ```

mod check;
pub mod common;
mod init;
mod mods;
mod server;
mod status;
mod update;


use crate::config::HostConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime options derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can drive commands without parsing.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    /// Configuration file overriding the default location.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber. `RUST_LOG` wins over the flags.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.as_deref().unwrap_or("info")));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load the configuration this invocation should use.
    pub async fn load_config(&self) -> Result<HostConfig> {
        HostConfig::load_with_optional(self.config_path.clone()).await
    }
}

/// Keep a game server and its mods up to date.
#[derive(Parser)]
#[command(
    name = "hostkeep",
    about = "Update engine for a self-hosted game server and its mods",
    version,
    long_about = "hostkeep checks upstream release feeds, applies engine and plugin updates \
                  with backup and rollback, and installs or removes mod packages."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: ~/.hostkeep/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show installed versions and server state
    Status(status::StatusCommand),

    /// Check upstream feeds for newer releases
    Check(check::CheckCommand),

    /// Update the engine or the plugin
    Update(update::UpdateCommand),

    /// Install, remove or inspect mod packages
    #[command(subcommand)]
    Mod(mods::ModCommand),

    /// Start or stop the server process
    #[command(subcommand)]
    Server(server::ServerCommand),

    /// Write a default configuration file
    Init(init::InitCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: Some(log_level.to_string()),
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let command = match self.command {
            Commands::Init(cmd) => return cmd.execute(config.config_path).await,
            other => other,
        };

        let host = config.load_config().await?;
        match command {
            Commands::Status(cmd) => cmd.execute(&host).await,
            Commands::Check(cmd) => cmd.execute(&host).await,
            Commands::Update(cmd) => cmd.execute(&host).await,
            Commands::Mod(cmd) => cmd.execute(&host).await,
            Commands::Server(cmd) => cmd.execute(&host).await,
            Commands::Init(cmd) => cmd.execute(config.config_path).await,
        }
    }
}
