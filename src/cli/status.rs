use super::common::{format_uptime, service};
use crate::config::HostConfig;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Print installed versions, whether the server runs, and the maintenance flag.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Print the status as JSON
    #[arg(long)]
    json: bool,
}

impl StatusCommand {
    pub async fn execute(self, config: &HostConfig) -> Result<()> {
        let service = service(config)?;
        let status = service.server_status().await;

        if self.json {
            let value = serde_json::json!({
                "installed_version": status.installed_version,
                "plugin_version": status.plugin_version,
                "is_running": status.is_running,
                "uptime_secs": status.uptime.map(|u| u.as_secs()),
                "maintenance": status.maintenance,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!("{} {}", "Engine:".bold(), status.installed_version);
        println!("{} {}", "Plugin:".bold(), status.plugin_version);
        if status.is_running {
            let uptime = status.uptime.map_or_else(|| "unknown".to_string(), format_uptime);
            println!("{} {} (up {})", "Server:".bold(), "running".green(), uptime);
        } else {
            println!("{} {}", "Server:".bold(), "stopped".yellow());
        }
        if status.maintenance {
            println!("{}", "Maintenance: update in progress".yellow());
        }

        Ok(())
    }
}
