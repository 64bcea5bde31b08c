use super::common::service;
use crate::config::HostConfig;
use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand, Debug)]
pub enum ServerCommand {
    /// Start the server and wait for it to warm up
    Start,
    /// Stop the server, force-killing it after the grace period
    Stop,
}

impl ServerCommand {
    pub async fn execute(self, config: &HostConfig) -> Result<()> {
        let service = service(config)?;
        match self {
            Self::Start => {
                if service.supervisor().is_running() {
                    println!("{}", "Server is already running".yellow());
                    return Ok(());
                }
                println!("{}", "Starting server...".cyan());
                service.start_server().await?;
                println!("{}", "Server started".green());
            }
            Self::Stop => {
                println!("{}", "Stopping server...".cyan());
                service.stop_server().await?;
                println!("{}", "Server stopped".green());
            }
        }
        Ok(())
    }
}
