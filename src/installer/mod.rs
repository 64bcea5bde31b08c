//! Installing and removing third-party mod packages.
//!
//! A package is downloaded and extracted into a per-install scratch
//! directory, normalized by [`layout::plan`], and only then moved into the
//! live runtime tree. A failed download or extraction therefore never leaves
//! partial files behind.
//!
//! The install slug is the package's identity on disk: exactly one
//! `<slug>` directory per recognized root. Reinstalling deletes and replaces
//! those directories, so installing twice equals installing once.

pub mod layout;

use crate::config::HostConfig;
use crate::constants::MAX_SWEEP_FILE_BYTES;
use crate::core::HostError;
use crate::fetch::HttpTransport;
use crate::utils::archive::extract_zip;
use crate::utils::fs::{copy_file_with_retry, ensure_dir, move_dir, remove_dir_all};
use crate::utils::slug::validate_slug;
use crate::utils::temp::ScratchDir;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What an install wrote into the runtime tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub slug: String,
    /// Live `<root>/<slug>` directories that were replaced.
    pub directories: Vec<PathBuf>,
    /// Files copied verbatim outside the recognized roots.
    pub verbatim_files: usize,
}

pub struct ModInstaller {
    transport: Arc<dyn HttpTransport>,
    runtime_dir: PathBuf,
    work_dir: PathBuf,
    roots: Vec<PathBuf>,
    config_dirs: Vec<PathBuf>,
}

impl ModInstaller {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, config: &HostConfig) -> Self {
        Self {
            transport,
            runtime_dir: config.runtime_dir(),
            work_dir: config.work_dir(),
            roots: vec![
                PathBuf::from(&config.mods.server_mods_root),
                PathBuf::from(&config.mods.client_plugins_root),
            ],
            config_dirs: config.mods.config_dirs.iter().map(PathBuf::from).collect(),
        }
    }

    fn slug_dirs(&self, slug: &str) -> impl Iterator<Item = PathBuf> + '_ {
        let slug = slug.to_string();
        self.roots.iter().map(move |root| self.runtime_dir.join(root).join(&slug))
    }

    /// Download, normalize and install the package at `download_url`.
    pub async fn install(&self, download_url: &str, slug: &str) -> Result<InstallReport, HostError> {
        validate_slug(slug)?;
        let scratch = ScratchDir::new(&self.work_dir, "mod").await?;

        let result = self.install_from(scratch.path(), download_url, slug).await;
        if let Err(e) = scratch.cleanup().await {
            warn!("Failed to remove mod scratch directory: {:#}", e);
        }

        match &result {
            Ok(report) => info!(
                slug,
                directories = report.directories.len(),
                verbatim = report.verbatim_files,
                "Mod installed"
            ),
            Err(e) => warn!(slug, "Mod install failed: {}", e),
        }
        result
    }

    async fn install_from(
        &self,
        scratch: &Path,
        download_url: &str,
        slug: &str,
    ) -> Result<InstallReport, HostError> {
        let archive = scratch.join("package.zip");
        let bytes = self.transport.download(download_url, &archive).await?;
        if bytes == 0 {
            return Err(HostError::validation(download_url, "downloaded package is empty"));
        }

        let staging = scratch.join("staging");
        if extract_zip(&archive, &staging).await? == 0 {
            return Err(HostError::archive(download_url, "package contains no files"));
        }
        let plan = layout::plan(&staging, &self.roots)?;

        let mut report = InstallReport {
            slug: slug.to_string(),
            ..InstallReport::default()
        };

        // Assemble every slug directory in scratch before touching the live tree
        let assembled = scratch.join("assembled");
        let mut ready = Vec::new();
        for (index, root) in plan.populated_roots().enumerate() {
            let slug_dir = assembled.join(index.to_string()).join(slug);
            ensure_dir(&slug_dir).await?;
            for (source, target) in &root.files {
                let dest = slug_dir.join(target);
                if let Some(parent) = dest.parent() {
                    ensure_dir(parent).await?;
                }
                copy_file_with_retry(source, &dest).await?;
            }
            ready.push((slug_dir, self.runtime_dir.join(&root.root).join(slug)));
        }

        for (slug_dir, live) in ready {
            remove_dir_all(&live).await?;
            move_dir(&slug_dir, &live).await?;
            debug!("Installed {}", live.display());
            report.directories.push(live);
        }

        for relative in &plan.verbatim {
            let dest = self.runtime_dir.join(relative);
            if let Some(parent) = dest.parent() {
                ensure_dir(parent).await?;
            }
            copy_file_with_retry(&plan.content_root.join(relative), &dest).await?;
            report.verbatim_files += 1;
        }

        Ok(report)
    }

    /// Whether a `<slug>` directory exists under either recognized root.
    #[must_use]
    pub fn is_installed(&self, slug: &str) -> bool {
        validate_slug(slug).is_ok() && self.slug_dirs(slug).any(|dir| dir.is_dir())
    }

    /// Remove the slug directories and any config files that mention the
    /// slug or `package_id`. Returns whether anything was removed.
    pub async fn uninstall(&self, slug: &str, package_id: Option<&str>) -> Result<bool, HostError> {
        validate_slug(slug)?;
        let mut removed = false;

        for dir in self.slug_dirs(slug) {
            if dir.is_dir() {
                remove_dir_all(&dir).await?;
                info!("Removed {}", dir.display());
                removed = true;
            }
        }

        let mut needles = vec![slug.to_lowercase()];
        if let Some(id) = package_id.map(str::trim).filter(|id| !id.is_empty()) {
            needles.push(id.to_lowercase());
        }

        for config_dir in &self.config_dirs {
            let dir = self.runtime_dir.join(config_dir);
            for file in matching_config_files(&dir, &needles).await {
                match tokio::fs::remove_file(&file).await {
                    Ok(()) => {
                        info!("Removed config {}", file.display());
                        removed = true;
                    }
                    Err(e) => warn!("Failed to remove {}: {}", file.display(), e),
                }
            }
        }

        Ok(removed)
    }
}

/// Files under `dir` no larger than the sweep limit whose content contains
/// any of `needles`, compared case-insensitively.
async fn matching_config_files(dir: &Path, needles: &[String]) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let too_large = entry.metadata().map_or(true, |m| m.len() > MAX_SWEEP_FILE_BYTES);
        if too_large {
            continue;
        }
        let Ok(bytes) = tokio::fs::read(entry.path()).await else {
            continue;
        };
        let content = String::from_utf8_lossy(&bytes).to_lowercase();
        if needles.iter().any(|needle| content.contains(needle.as_str())) {
            matches.push(entry.into_path());
        }
    }
    matches
}
