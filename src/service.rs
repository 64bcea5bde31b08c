//! Caller-facing composition of the update engine.
//!
//! [`HostService`] owns exactly one [`FetchCache`] and hands it to every
//! component that talks to an upstream, so the concurrency limiter and the
//! call spacing apply process-wide.

use crate::catalog::ModCatalog;
use crate::config::HostConfig;
use crate::core::{HostError, HostResult};
use crate::fetch::{FetchCache, HttpTransport, ReqwestTransport};
use crate::installer::{InstallReport, ModInstaller};
use crate::models::{ArtifactKind, ModPackage, ServerStatus, UpdateInfo};
use crate::process::{ProcessBackend, ProcessSupervisor, SysinfoBackend};
use crate::updater::{ArtifactUpdater, DiskSpace, MaintenanceFlag, SystemDiskSpace, UpdateOutcome};
use crate::version::{VersionFileStore, VersionResolver, extract_version};
use anyhow::Result;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub struct HostService {
    fetch: Arc<FetchCache>,
    versions: Arc<VersionFileStore>,
    resolver: VersionResolver,
    supervisor: Arc<ProcessSupervisor>,
    updater: ArtifactUpdater,
    installer: ModInstaller,
    catalog: ModCatalog,
    flag_path: PathBuf,
    last_checks: DashMap<ArtifactKind, UpdateInfo>,
}

impl HostService {
    /// Build the production stack: reqwest transport, sysinfo process table
    /// and the real disk probe.
    pub fn new(config: &HostConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.fetch, config.github_token())?);
        Ok(Self::with_parts(
            config,
            transport,
            Arc::new(SysinfoBackend),
            Arc::new(SystemDiskSpace),
        ))
    }

    /// Build the stack around injected collaborators.
    #[must_use]
    pub fn with_parts(
        config: &HostConfig,
        transport: Arc<dyn HttpTransport>,
        processes: Arc<dyn ProcessBackend>,
        disk: Arc<dyn DiskSpace>,
    ) -> Self {
        let fetch = Arc::new(FetchCache::new(transport.clone(), &config.fetch));
        let versions = Arc::new(VersionFileStore::new(config));
        let supervisor = Arc::new(ProcessSupervisor::new(processes, config));

        Self {
            resolver: VersionResolver::new(fetch.clone(), versions.clone(), config),
            updater: ArtifactUpdater::new(
                fetch.clone(),
                supervisor.clone(),
                versions.clone(),
                disk,
                config,
            ),
            installer: ModInstaller::new(transport, config),
            catalog: ModCatalog::new(fetch.clone(), config),
            flag_path: config.maintenance_flag_path(),
            last_checks: DashMap::new(),
            fetch,
            versions,
            supervisor,
        }
    }

    #[must_use]
    pub fn fetch(&self) -> &FetchCache {
        &self.fetch
    }

    #[must_use]
    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Compare the installed version of `kind` with its upstream feed.
    ///
    /// Never fails; an unreachable feed reports no update.
    pub async fn check_update(&self, kind: ArtifactKind) -> UpdateInfo {
        let info = self.resolver.check_update(kind).await;
        self.last_checks.insert(kind, info.clone());
        info
    }

    /// The result of the most recent check for `kind`, if any.
    #[must_use]
    pub fn last_check(&self, kind: ArtifactKind) -> Option<UpdateInfo> {
        self.last_checks.get(&kind).map(|entry| entry.value().clone())
    }

    /// Update `kind` from `download_url`, or from the latest release when no
    /// URL is given.
    pub async fn perform_update(
        &self,
        kind: ArtifactKind,
        download_url: Option<&str>,
    ) -> HostResult<UpdateOutcome> {
        let check = match self.last_check(kind) {
            Some(info) if download_url.is_some() || info.download_url.is_some() => info,
            _ => self.check_update(kind).await,
        };

        let url = match download_url {
            Some(url) => url.to_string(),
            None => check.download_url.clone().ok_or_else(|| {
                HostError::validation(
                    format!("{kind} update"),
                    "no download URL given and no release asset found upstream",
                )
            })?,
        };

        let version = extract_version(&url).unwrap_or_else(|| check.latest.clone());
        debug!(%kind, %url, %version, "Resolved update target");

        let outcome = self.updater.update(kind, &url, &version).await?;
        if outcome.is_success() {
            self.last_checks.remove(&kind);
        }
        Ok(outcome)
    }

    pub async fn install_mod(&self, download_url: &str, slug: &str) -> HostResult<InstallReport> {
        self.installer.install(download_url, slug).await
    }

    /// Resolve `mod_id` through the catalog and install its current release.
    pub async fn install_mod_by_id(&self, mod_id: &str) -> HostResult<(ModPackage, InstallReport)> {
        let package = self.catalog.resolve(mod_id).await.ok_or_else(|| {
            HostError::validation(format!("mod {mod_id}"), "not found in the catalog")
        })?;
        info!(id = %package.id, version = %package.version, slug = %package.install_slug, "Resolved mod");
        let report = self.installer.install(&package.download_url, &package.install_slug).await?;
        Ok((package, report))
    }

    #[must_use]
    pub fn is_mod_installed(&self, slug: &str) -> bool {
        self.installer.is_installed(slug)
    }

    pub async fn uninstall_mod(&self, slug: &str, package_id: Option<&str>) -> HostResult<bool> {
        self.installer.uninstall(slug, package_id).await
    }

    pub async fn server_status(&self) -> ServerStatus {
        ServerStatus {
            installed_version: self.versions.read(ArtifactKind::Engine).await,
            plugin_version: self.versions.read(ArtifactKind::Plugin).await,
            is_running: self.supervisor.is_running(),
            uptime: self.supervisor.uptime(),
            maintenance: self.updater.is_updating() || MaintenanceFlag::is_active(&self.flag_path),
        }
    }

    pub async fn start_server(&self) -> HostResult<()> {
        self.supervisor.start().await
    }

    /// Stop the server, force-killing it after the configured grace period.
    pub async fn stop_server(&self) -> HostResult<()> {
        if self.supervisor.stop(self.supervisor.stop_timeout()).await {
            Ok(())
        } else {
            Err(HostError::process("stop", "server still running after kill"))
        }
    }
}
