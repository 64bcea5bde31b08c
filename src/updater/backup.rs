//! Full-tree backup and restore of the live runtime directory.

use crate::utils::fs::{copy_tree, move_dir, remove_dir_all};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const RESTORE_ATTEMPTS: u32 = 3;

/// A completed copy of the runtime tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Copies the live tree aside before an update and puts it back on rollback.
pub struct BackupManager {
    live_path: PathBuf,
    backup_path: PathBuf,
}

impl BackupManager {
    /// `session_dir` must be on the same filesystem as `live_path` for the
    /// restore to be a rename.
    #[must_use]
    pub fn new(live_path: &Path, session_dir: &Path) -> Self {
        Self {
            live_path: live_path.to_path_buf(),
            backup_path: session_dir.join("backup"),
        }
    }

    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Copy the live tree. `None` when there is no live tree to preserve.
    pub async fn create(&self) -> Result<Option<BackupSnapshot>> {
        if !self.live_path.exists() {
            info!("No runtime tree at {}, skipping backup", self.live_path.display());
            return Ok(None);
        }

        info!("Creating backup at {}", self.backup_path.display());
        remove_dir_all(&self.backup_path).await?;
        let files = copy_tree(&self.live_path, &self.backup_path)
            .await
            .context("Failed to create backup")?;
        debug!("Backed up {} files", files);

        Ok(Some(BackupSnapshot {
            path: self.backup_path.clone(),
            created_at: Utc::now(),
        }))
    }

    /// Replace the live tree with the backup.
    pub async fn restore(&self) -> Result<()> {
        if !self.backup_path.exists() {
            bail!("No backup found at {}", self.backup_path.display());
        }

        warn!("Restoring runtime tree from {}", self.backup_path.display());
        let mut attempt = 1;
        loop {
            match self.attempt_restore().await {
                Ok(()) => {
                    info!("Runtime tree restored from backup");
                    return Ok(());
                }
                Err(e) if attempt < RESTORE_ATTEMPTS => {
                    warn!("Restore attempt {} failed: {:#}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!(
                        "Failed to restore backup after {RESTORE_ATTEMPTS} attempts"
                    )));
                }
            }
        }
    }

    async fn attempt_restore(&self) -> Result<()> {
        remove_dir_all(&self.live_path)
            .await
            .context("Failed to remove the updated runtime tree")?;
        move_dir(&self.backup_path, &self.live_path)
            .await
            .context("Failed to move backup into place")
    }

    pub async fn discard(&self) -> Result<()> {
        if self.backup_path.exists() {
            debug!("Removing backup at {}", self.backup_path.display());
            remove_dir_all(&self.backup_path).await?;
        }
        Ok(())
    }
}
