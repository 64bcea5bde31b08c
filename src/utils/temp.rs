//! Per-session scratch directories with RAII cleanup.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A uniquely named directory under a work root, removed when dropped.
///
/// Update sessions keep their download, staging area and backup here so a
/// crashed or abandoned session never leaves files inside the runtime tree.
/// Prefer [`ScratchDir::cleanup`] on the async path; `Drop` is the fallback.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    keep: bool,
}

impl ScratchDir {
    /// Create `<root>/<prefix>-<uuid>`.
    pub async fn new(root: &Path, prefix: &str) -> Result<Self> {
        let path = root.join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("Failed to create scratch directory: {}", path.display()))?;
        Ok(Self {
            path,
            keep: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the directory on disk when dropped.
    ///
    /// Used when a rollback fails and the backup inside is the only copy of
    /// the previous tree.
    pub fn persist(&mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }

    /// Remove the directory now.
    pub async fn cleanup(mut self) -> Result<()> {
        if self.keep {
            return Ok(());
        }
        let result = super::fs::remove_dir_all(&self.path).await;
        self.keep = true;
        result
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.keep && self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to remove scratch directory {}: {}", self.path.display(), e);
            }
        }
    }
}
