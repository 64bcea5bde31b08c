use super::common::service;
use crate::config::HostConfig;
use crate::models::ArtifactKind;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Compare installed versions with the upstream release feeds.
///
/// A feed that cannot be reached reports "up to date"; run with `--verbose`
/// to see why a check came back empty.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Only check this artifact (default: both)
    #[arg(value_enum)]
    kind: Option<ArtifactKind>,
}

impl CheckCommand {
    pub async fn execute(self, config: &HostConfig) -> Result<()> {
        let service = service(config)?;
        let kinds = self.kind.map_or_else(|| ArtifactKind::ALL.to_vec(), |kind| vec![kind]);

        for kind in kinds {
            let info = service.check_update(kind).await;
            if info.update_available {
                println!(
                    "{}",
                    format!("{kind}: update available {} -> {}", info.current, info.latest).green()
                );
                if let Some(url) = &info.download_url {
                    println!("  {} {}", "asset:".dimmed(), url);
                }
                println!("  Run `hostkeep update {kind}` to install it");
            } else {
                println!("{kind}: up to date ({})", info.current);
            }
        }

        Ok(())
    }
}
