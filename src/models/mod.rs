//! Shared data models for hostkeep operations
//!
//! These are the values that cross component boundaries: which artifact an
//! operation targets, what a version check decided, what a mod package looks
//! like once resolved, and the status snapshot reported to callers.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One of the two versioned runtime components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The server engine itself.
    Engine,
    /// The multiplayer plugin layered on top of the engine.
    Plugin,
}

impl ArtifactKind {
    pub const ALL: [Self; 2] = [Self::Engine, Self::Plugin];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installed and upstream state of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub installed_version: String,
    pub latest_version: String,
    pub download_url: Option<String>,
    pub release_notes: Option<String>,
}

/// Result of a version check. Never an error: an unreachable feed yields
/// `update_available == false` with `latest == current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub update_available: bool,
    pub current: String,
    pub latest: String,
    pub download_url: Option<String>,
    pub notes: Option<String>,
}

impl UpdateInfo {
    /// The fail-safe answer used whenever the feed cannot be read.
    #[must_use]
    pub fn no_update(current: impl Into<String>) -> Self {
        let current = current.into();
        Self {
            update_available: false,
            latest: current.clone(),
            current,
            download_url: None,
            notes: None,
        }
    }

    /// Fold the check into the artifact view used by status pages.
    #[must_use]
    pub fn into_artifact(self, kind: ArtifactKind) -> Artifact {
        Artifact {
            kind,
            installed_version: self.current,
            latest_version: self.latest,
            download_url: self.download_url,
            release_notes: self.notes,
        }
    }
}

/// A third-party content package resolved from the mod catalog.
///
/// `install_slug` is the installation identity. Two packages whose names
/// slugify identically share one install location; the last install wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModPackage {
    pub id: String,
    pub name: String,
    pub version: String,
    pub download_url: String,
    pub install_slug: String,
}

/// Snapshot reported by `serverStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub installed_version: String,
    pub plugin_version: String,
    pub is_running: bool,
    pub uptime: Option<Duration>,
    pub maintenance: bool,
}
