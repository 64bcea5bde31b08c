//! Upstream update detection for runtime artifacts.

use super::comparison::is_newer;
use super::release::{ReleaseCandidate, parse_feed, select_candidate};
use super::version_file::VersionFileStore;
use crate::config::{ArtifactConfig, HostConfig};
use crate::fetch::{CacheDuration, FetchCache};
use crate::models::{ArtifactKind, UpdateInfo};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answers "is there a newer release of this artifact?".
///
/// Never fails: an unreachable, empty or malformed feed yields
/// [`UpdateInfo::no_update`].
pub struct VersionResolver {
    fetch: Arc<FetchCache>,
    versions: Arc<VersionFileStore>,
    engine: ArtifactConfig,
    plugin: ArtifactConfig,
    max_retries: u32,
}

impl VersionResolver {
    #[must_use]
    pub fn new(fetch: Arc<FetchCache>, versions: Arc<VersionFileStore>, config: &HostConfig) -> Self {
        Self {
            fetch,
            versions,
            engine: config.engine.clone(),
            plugin: config.plugin.clone(),
            max_retries: config.fetch.max_retries,
        }
    }

    #[must_use]
    pub const fn artifact(&self, kind: ArtifactKind) -> &ArtifactConfig {
        match kind {
            ArtifactKind::Engine => &self.engine,
            ArtifactKind::Plugin => &self.plugin,
        }
    }

    /// Feed URL for `kind`, used to invalidate its cache entry after an update.
    #[must_use]
    pub fn feed_url(&self, kind: ArtifactKind) -> &str {
        &self.artifact(kind).feed_url
    }

    pub async fn check_update(&self, kind: ArtifactKind) -> UpdateInfo {
        let current = self.versions.read(kind).await;
        let artifact = self.artifact(kind);

        let Some(content) =
            self.fetch.fetch(&artifact.feed_url, self.max_retries, CacheDuration::Long).await
        else {
            debug!(%kind, "Release feed unavailable, reporting no update");
            return UpdateInfo::no_update(current);
        };

        let info = decide(&current, &content, artifact);
        if info.update_available {
            info!(%kind, current = %info.current, latest = %info.latest, "Update available");
        }
        info
    }
}

/// Pure decision over fetched feed content.
#[must_use]
pub fn decide(current: &str, feed: &str, artifact: &ArtifactConfig) -> UpdateInfo {
    let releases = match parse_feed(feed) {
        Ok(releases) => releases,
        Err(e) => {
            warn!(feed = %artifact.feed_url, "Malformed release feed: {}", e);
            return UpdateInfo::no_update(current);
        }
    };

    let Some(ReleaseCandidate {
        version,
        asset_url,
        body,
        ..
    }) = select_candidate(&releases, artifact)
    else {
        debug!(feed = %artifact.feed_url, "No release with an archive asset");
        return UpdateInfo::no_update(current);
    };

    let latest = version.to_string();
    UpdateInfo {
        update_available: !version.is_unknown() && is_newer(&latest, current),
        current: current.to_string(),
        latest,
        download_url: Some(asset_url),
        notes: body,
    }
}
