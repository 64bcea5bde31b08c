//! Persisted maintenance flag read by the external liveness monitor.
//!
//! While an update runs, the monitor must not kill the server for looking
//! dead. The flag file exists for exactly the duration of the session and
//! is held under an exclusive OS lock, so a flag left behind by a crashed
//! process can be told apart from a live one.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, default_lock_timeout};
use crate::models::ArtifactKind;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

/// Contents of the flag file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceInfo {
    pub kind: ArtifactKind,
    pub started_at: DateTime<Utc>,
    pub pid: u32,
}

/// A raised maintenance flag. Dropping it removes the file.
#[derive(Debug)]
pub struct MaintenanceFlag {
    _file: Arc<File>,
    path: PathBuf,
}

impl Drop for MaintenanceFlag {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Maintenance flag lowered");
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            debug!(error = %e, "Failed to remove maintenance flag");
        }
    }
}

impl MaintenanceFlag {
    pub async fn raise(path: &Path, kind: ArtifactKind) -> Result<Self> {
        Self::raise_with_timeout(path, kind, default_lock_timeout()).await
    }

    pub async fn raise_with_timeout(path: &Path, kind: ArtifactKind, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create maintenance flag directory: {}", parent.display())
            })?;
        }

        let open_path = path.to_path_buf();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .context("spawn_blocking panicked")?
        .with_context(|| format!("Failed to open maintenance flag: {}", path.display()))?;
        let file = Arc::new(file);

        let start = std::time::Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let locking = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || locking.try_lock_exclusive())
                .await
                .context("spawn_blocking panicked")?;

            if matches!(locked, Ok(true)) {
                let info = MaintenanceInfo {
                    kind,
                    started_at: Utc::now(),
                    pid: std::process::id(),
                };
                let writing = Arc::clone(&file);
                tokio::task::spawn_blocking(move || write_info(&writing, &info))
                    .await
                    .context("spawn_blocking panicked")??;

                debug!(path = %path.display(), %kind, "Maintenance flag raised");
                return Ok(Self {
                    _file: file,
                    path: path.to_path_buf(),
                });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        Err(anyhow::anyhow!(
            "Timeout acquiring maintenance flag {} after {:?}",
            path.display(),
            timeout
        ))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a live session holds the flag at `path`.
    ///
    /// A file that exists but is not locked was left by a crashed session
    /// and does not count.
    #[must_use]
    pub fn is_active(path: &Path) -> bool {
        let Ok(file) = OpenOptions::new().read(true).write(true).open(path) else {
            return false;
        };
        !matches!(file.try_lock_exclusive(), Ok(true))
    }

    /// Parse the flag file, if present.
    #[must_use]
    pub fn read(path: &Path) -> Option<MaintenanceInfo> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }
}

fn write_info(file: &File, info: &MaintenanceInfo) -> Result<()> {
    let json = serde_json::to_vec_pretty(info)?;
    file.set_len(0)?;
    let mut writer = file;
    writer.write_all(&json)?;
    writer.sync_all()?;
    Ok(())
}
