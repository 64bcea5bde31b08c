use super::common::{confirm, service};
use crate::config::HostConfig;
use crate::core::HostError;
use crate::models::ArtifactKind;
use crate::updater::UpdateOutcome;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

/// Run an update session: backup, stop, install, restart, with rollback on
/// failure.
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Artifact to update
    #[arg(value_enum)]
    kind: ArtifactKind,

    /// Archive to install instead of the latest upstream release
    #[arg(long)]
    url: Option<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

impl UpdateCommand {
    pub async fn execute(self, config: &HostConfig) -> Result<()> {
        let service = service(config)?;
        let kind = self.kind;

        if self.url.is_none() {
            println!("{}", "Checking for updates...".cyan());
            let info = service.check_update(kind).await;
            if !info.update_available {
                println!("{}", format!("{kind} is up to date ({})", info.current).green());
                return Ok(());
            }
            println!("Update available: {} -> {}", info.current, info.latest);
        }

        if !self.yes
            && !confirm(&format!("The server will be stopped to update the {kind}. Continue?"))?
        {
            println!("Update cancelled");
            return Ok(());
        }

        println!("{}", format!("Updating {kind}...").cyan());
        let outcome = service.perform_update(kind, self.url.as_deref()).await?;

        match &outcome {
            UpdateOutcome::Succeeded { version } => {
                println!("{}", format!("Updated {kind} to {version}").green());
                Ok(())
            }
            UpdateOutcome::Failed { rolled_back, .. } => {
                eprintln!("{}", outcome.to_string().red());
                if *rolled_back {
                    eprintln!("The previous installation was restored.");
                }
                bail!("{kind} update failed")
            }
            UpdateOutcome::RollbackFailed { .. } => Err(rollback_error(kind, &outcome).into()),
        }
    }
}

/// Fatal outcomes leave the binary as a typed error carrying the operator
/// guidance.
fn rollback_error(kind: ArtifactKind, outcome: &UpdateOutcome) -> HostError {
    HostError::RollbackFailed {
        reason: format!("{kind} update {outcome}"),
    }
}
