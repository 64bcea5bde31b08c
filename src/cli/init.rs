//! Write a default configuration file.
//!
//! ```bash
//! hostkeep init --runtime-dir /srv/spt
//! hostkeep --config ./host.toml init --force
//! ```

use crate::config::HostConfig;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InitCommand {
    /// Root of the server installation
    #[arg(long)]
    runtime_dir: Option<PathBuf>,

    /// Overwrite an existing configuration file
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let path = match config_path {
            Some(path) => path,
            None => HostConfig::default_path()?,
        };

        if path.exists() && !self.force {
            bail!("Configuration already exists at {}. Use --force to overwrite", path.display());
        }

        let mut config = HostConfig::default();
        if let Some(runtime_dir) = self.runtime_dir {
            config.runtime_dir = runtime_dir;
        }
        config.save_to(&path).await?;

        println!("{}", format!("Wrote {}", path.display()).green());
        println!("Next: review the [engine] and [plugin] feeds, then run `hostkeep check`");
        Ok(())
    }
}
