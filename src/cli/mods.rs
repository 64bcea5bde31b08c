//! `hostkeep mod` subcommands.

use super::common::{is_url, service};
use crate::config::HostConfig;
use crate::utils::slugify;
use anyhow::{Result, bail};
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand, Debug)]
pub enum ModCommand {
    /// Install a package by catalog id or direct download URL
    Install {
        /// Catalog id, or an http(s) URL of a .zip archive
        source: String,

        /// Install slug; required for URLs, derived from the name for ids
        #[arg(long)]
        slug: Option<String>,
    },

    /// Remove an installed package and its config files
    Remove {
        slug: String,

        /// Catalog id, also matched when sweeping config files
        #[arg(long)]
        id: Option<String>,
    },

    /// Report whether a package is installed
    Status { slug: String },
}

impl ModCommand {
    pub async fn execute(self, config: &HostConfig) -> Result<()> {
        let service = service(config)?;

        match self {
            Self::Install { source, slug } => {
                if is_url(&source) {
                    let Some(slug) = slug else {
                        bail!("--slug is required when installing from a URL");
                    };
                    let slug = slugify(&slug)?;
                    let report = service.install_mod(&source, &slug).await?;
                    println!(
                        "{}",
                        format!(
                            "Installed {} ({} directories, {} other files)",
                            report.slug,
                            report.directories.len(),
                            report.verbatim_files
                        )
                        .green()
                    );
                } else {
                    if slug.is_some() {
                        println!("{}", "--slug is ignored for catalog installs".yellow());
                    }
                    let (package, report) = service.install_mod_by_id(&source).await?;
                    println!(
                        "{}",
                        format!("Installed {} {} as {}", package.name, package.version, report.slug)
                            .green()
                    );
                }
            }
            Self::Remove { slug, id } => {
                if service.uninstall_mod(&slug, id.as_deref()).await? {
                    println!("{}", format!("Removed {slug}").green());
                } else {
                    println!("{}", format!("{slug} is not installed").yellow());
                }
            }
            Self::Status { slug } => {
                if service.is_mod_installed(&slug) {
                    println!("{slug}: {}", "installed".green());
                } else {
                    println!("{slug}: {}", "not installed".yellow());
                }
            }
        }
        Ok(())
    }
}
