//! Persisted installed-version records, one plain-text file per artifact.

use crate::config::HostConfig;
use crate::models::ArtifactKind;
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads and writes the version file that is the source of truth for what
/// is installed.
///
/// Lookup order for [`read`](Self::read): the file, then an in-memory
/// fallback set after a successful update, then the configured cold-start
/// default.
#[derive(Debug)]
pub struct VersionFileStore {
    paths: HashMap<ArtifactKind, PathBuf>,
    defaults: HashMap<ArtifactKind, String>,
    fallback: DashMap<ArtifactKind, String>,
}

impl VersionFileStore {
    #[must_use]
    pub fn new(config: &HostConfig) -> Self {
        let mut paths = HashMap::new();
        let mut defaults = HashMap::new();
        for kind in ArtifactKind::ALL {
            paths.insert(kind, config.version_file(kind));
            defaults.insert(kind, config.default_version(kind));
        }
        Self {
            paths,
            defaults,
            fallback: DashMap::new(),
        }
    }

    #[must_use]
    pub fn path(&self, kind: ArtifactKind) -> Option<&Path> {
        self.paths.get(&kind).map(PathBuf::as_path)
    }

    pub async fn read(&self, kind: ArtifactKind) -> String {
        if let Some(path) = self.path(kind) {
            match tokio::fs::read_to_string(path).await {
                Ok(content) if !content.trim().is_empty() => return content.trim().to_string(),
                Ok(_) => debug!("Version file {} is empty", path.display()),
                Err(e) => debug!("Version file {} unreadable: {}", path.display(), e),
            }
        }

        if let Some(value) = self.fallback.get(&kind) {
            return value.clone();
        }
        self.defaults.get(&kind).cloned().unwrap_or_default()
    }

    /// Atomically replace the version file for `kind`.
    pub async fn write(&self, kind: ArtifactKind, version: &str) -> Result<()> {
        let path = self
            .path(kind)
            .with_context(|| format!("No version file configured for {kind}"))?;
        atomic_write(path, format!("{}\n", version.trim()).as_bytes())
            .await
            .with_context(|| format!("Failed to persist {kind} version {version}"))
    }

    pub fn set_fallback(&self, kind: ArtifactKind, version: &str) {
        self.fallback.insert(kind, version.trim().to_string());
    }
}
