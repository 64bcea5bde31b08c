//! Download-install-restart cycle for the engine and plugin artifacts.
//!
//! [`ArtifactUpdater::update`] drives one session through the fixed stage
//! order of [`UpdateStage`]:
//!
//! ```text
//! DiskSpaceCheck -> Backup -> Stop -> Download -> ValidateDownload -> Extract
//!   -> Install -> ValidateInstall -> RestoreConfig -> Restart
//! ```
//!
//! Failures before `Download` leave the live tree untouched and simply end
//! the session. Failures from `Download` onwards restore the backup (when
//! one exists) and restart the previous server. A failed restore ends in
//! [`UpdateOutcome::RollbackFailed`] and keeps the session directory on disk
//! because it holds the only copy of the previous tree.
//!
//! Only one session runs at a time: an in-process mutex rejects concurrent
//! calls with [`HostError::UpdateInProgress`], and a [`MaintenanceFlag`] is
//! raised for the external liveness monitor for the session's duration.

pub mod backup;
pub mod disk;
pub mod maintenance;
pub mod preserve;
pub mod stage;
pub mod verification;

pub use backup::{BackupManager, BackupSnapshot};
pub use disk::{DiskSpace, SystemDiskSpace};
pub use maintenance::{MaintenanceFlag, MaintenanceInfo};
pub use stage::{UpdateOutcome, UpdateStage};
pub use verification::DownloadVerifier;

use crate::config::{ArtifactConfig, HostConfig};
use crate::constants::DISK_SPACE_FACTOR;
use crate::core::HostError;
use crate::fetch::FetchCache;
use crate::models::ArtifactKind;
use crate::process::ProcessSupervisor;
use crate::utils::archive::extract_zip;
use crate::utils::fs::copy_tree;
use crate::utils::temp::ScratchDir;
use crate::version::VersionFileStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

type StageResult<T> = Result<T, (UpdateStage, HostError)>;

fn at<E: Into<HostError>>(stage: UpdateStage) -> impl FnOnce(E) -> (UpdateStage, HostError) {
    move |e| (stage, e.into())
}

pub struct ArtifactUpdater {
    fetch: Arc<FetchCache>,
    supervisor: Arc<ProcessSupervisor>,
    versions: Arc<VersionFileStore>,
    disk: Arc<dyn DiskSpace>,
    runtime_dir: PathBuf,
    work_dir: PathBuf,
    flag_path: PathBuf,
    engine: ArtifactConfig,
    plugin: ArtifactConfig,
    settle: Duration,
    session: Mutex<()>,
}

impl ArtifactUpdater {
    #[must_use]
    pub fn new(
        fetch: Arc<FetchCache>,
        supervisor: Arc<ProcessSupervisor>,
        versions: Arc<VersionFileStore>,
        disk: Arc<dyn DiskSpace>,
        config: &HostConfig,
    ) -> Self {
        Self {
            fetch,
            supervisor,
            versions,
            disk,
            runtime_dir: config.runtime_dir(),
            work_dir: config.work_dir(),
            flag_path: config.maintenance_flag_path(),
            engine: config.engine.clone(),
            plugin: config.plugin.clone(),
            settle: config.server.settle(),
            session: Mutex::new(()),
        }
    }

    const fn artifact(&self, kind: ArtifactKind) -> &ArtifactConfig {
        match kind {
            ArtifactKind::Engine => &self.engine,
            ArtifactKind::Plugin => &self.plugin,
        }
    }

    /// Whether a session is currently running in this process.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.session.try_lock().is_err()
    }

    /// Run one update session for `kind`.
    ///
    /// `Err` only when the session could not start at all; every started
    /// session ends in an [`UpdateOutcome`].
    pub async fn update(
        &self,
        kind: ArtifactKind,
        download_url: &str,
        target_version: &str,
    ) -> Result<UpdateOutcome, HostError> {
        let _session = self.session.try_lock().map_err(|_| HostError::UpdateInProgress)?;
        let _flag = MaintenanceFlag::raise(&self.flag_path, kind).await.map_err(|e| {
            warn!("Maintenance flag unavailable: {:#}", e);
            HostError::UpdateInProgress
        })?;

        info!(%kind, version = target_version, url = download_url, "Starting update session");

        if let Err(e) = self.check_disk_space(kind) {
            warn!(%kind, stage = %UpdateStage::DiskSpaceCheck, "{}", e);
            return Ok(UpdateOutcome::Failed {
                stage: UpdateStage::DiskSpaceCheck,
                reason: e.to_string(),
                rolled_back: false,
            });
        }

        let mut scratch = ScratchDir::new(&self.work_dir, "session")
            .await
            .map_err(HostError::from)?;
        let backup = BackupManager::new(&self.runtime_dir, scratch.path());

        let outcome = self.run(kind, download_url, target_version, scratch.path(), &backup).await;

        match &outcome {
            UpdateOutcome::Succeeded {
                version,
            } => info!(%kind, version = %version, "Update finished"),
            UpdateOutcome::Failed {
                stage,
                reason,
                rolled_back,
            } => warn!(%kind, %stage, rolled_back, "Update failed: {}", reason),
            UpdateOutcome::RollbackFailed {
                stage,
                reason,
                rollback_error,
            } => {
                let kept = scratch.persist();
                error!(
                    %kind,
                    %stage,
                    backup = %backup.backup_path().display(),
                    session = %kept.display(),
                    "Update failed ({}) and rollback failed ({}); manual intervention required",
                    reason,
                    rollback_error
                );
            }
        }

        if !outcome.requires_operator() {
            if let Err(e) = backup.discard().await {
                warn!("Failed to remove backup: {:#}", e);
            }
            if let Err(e) = scratch.cleanup().await {
                warn!("Failed to remove session directory: {:#}", e);
            }
        }

        Ok(outcome)
    }

    async fn run(
        &self,
        kind: ArtifactKind,
        download_url: &str,
        target_version: &str,
        session_dir: &Path,
        backup: &BackupManager,
    ) -> UpdateOutcome {
        let snapshot = match backup.create().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return UpdateOutcome::Failed {
                    stage: UpdateStage::Backup,
                    reason: format!("{e:#}"),
                    rolled_back: false,
                };
            }
        };
        if snapshot.is_none() {
            info!(%kind, "First install: session cannot be rolled back");
        }

        if let Err(e) = self.stop_server().await {
            return UpdateOutcome::Failed {
                stage: UpdateStage::Stop,
                reason: e.to_string(),
                rolled_back: false,
            };
        }

        let applied = self.apply(kind, download_url, session_dir, snapshot.as_ref()).await;
        let restarted = match applied {
            Ok(()) => self.supervisor.start().await.map_err(at(UpdateStage::Restart)),
            Err(e) => Err(e),
        };

        if let Err((stage, e)) = restarted {
            return self.roll_back(stage, &e, snapshot.is_some(), backup).await;
        }

        if let Err(e) = self.versions.write(kind, target_version).await {
            warn!(%kind, "Installed {} but could not record it: {:#}", target_version, e);
        }
        if kind == ArtifactKind::Engine {
            self.versions.set_fallback(kind, target_version);
        }
        self.fetch.invalidate(&self.artifact(kind).feed_url);

        UpdateOutcome::Succeeded {
            version: target_version.to_string(),
        }
    }

    fn check_disk_space(&self, kind: ArtifactKind) -> Result<(), HostError> {
        let required =
            disk::required_bytes(self.artifact(kind).expected_download_bytes, DISK_SPACE_FACTOR);
        match self.disk.available_bytes(&self.work_dir) {
            Some(available) if available < required => Err(HostError::DiskSpaceInsufficient {
                required,
                available,
            }),
            Some(available) => {
                debug!(available, required, "Disk space check passed");
                Ok(())
            }
            None => {
                warn!("Free disk space unknown for {}, proceeding", self.work_dir.display());
                Ok(())
            }
        }
    }

    async fn stop_server(&self) -> Result<(), HostError> {
        self.supervisor.stop(self.supervisor.stop_timeout()).await;
        tokio::time::sleep(self.settle).await;

        if self.supervisor.is_running() && !self.supervisor.kill_all().await {
            return Err(HostError::process("stop", "server still running after force-kill"));
        }
        Ok(())
    }

    /// Download through RestoreConfig. Every error names its stage.
    async fn apply(
        &self,
        kind: ArtifactKind,
        download_url: &str,
        session_dir: &Path,
        snapshot: Option<&BackupSnapshot>,
    ) -> StageResult<()> {
        let artifact = self.artifact(kind);
        let archive = session_dir.join(download_file_name(download_url));

        let bytes = self
            .fetch
            .transport()
            .download(download_url, &archive)
            .await
            .map_err(at(UpdateStage::Download))?;
        debug!(%kind, bytes, "Download complete");

        DownloadVerifier::validate_download(&archive, artifact.min_download_bytes)
            .await
            .map_err(at(UpdateStage::ValidateDownload))?;

        let staging = session_dir.join("staging");
        let extracted =
            extract_zip(&archive, &staging).await.map_err(at(UpdateStage::Extract))?;
        if extracted == 0 {
            return Err((
                UpdateStage::Extract,
                HostError::archive(archive.display(), "archive contains no files"),
            ));
        }

        let copied =
            copy_tree(&staging, &self.runtime_dir).await.map_err(at(UpdateStage::Install))?;
        info!(%kind, files = copied, "Installed into {}", self.runtime_dir.display());

        DownloadVerifier::validate_install(&self.runtime_dir, &artifact.marker_paths)
            .map_err(at(UpdateStage::ValidateInstall))?;

        if let Some(snapshot) = snapshot
            && !artifact.preserved_configs.is_empty()
        {
            preserve::restore_preserved(&snapshot.path, &self.runtime_dir, &artifact.preserved_configs)
                .await
                .map_err(at(UpdateStage::RestoreConfig))?;
        }

        Ok(())
    }

    async fn roll_back(
        &self,
        stage: UpdateStage,
        cause: &HostError,
        has_backup: bool,
        backup: &BackupManager,
    ) -> UpdateOutcome {
        let reason = cause.to_string();
        if !has_backup {
            warn!(%stage, "No backup to restore; runtime tree left as is");
            return UpdateOutcome::Failed {
                stage,
                reason,
                rolled_back: false,
            };
        }

        warn!(%stage, "Rolling back: {}", reason);
        if self.supervisor.is_running() {
            self.supervisor.stop(self.supervisor.stop_timeout()).await;
        }

        if let Err(e) = backup.restore().await {
            return UpdateOutcome::RollbackFailed {
                stage,
                reason,
                rollback_error: format!("{e:#}"),
            };
        }

        if let Err(e) = self.supervisor.start().await {
            warn!("Restored previous version but the server did not start: {}", e);
        }

        UpdateOutcome::Failed {
            stage,
            reason,
            rolled_back: true,
        }
    }
}

/// Unique file name for a download, keeping the URL's extension.
fn download_file_name(url: &str) -> String {
    let extension = url
        .rsplit('/')
        .next()
        .and_then(|name| name.split(['?', '#']).next())
        .and_then(|name| Path::new(name).extension())
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_else(|| "zip".to_string());
    format!("download-{}.{extension}", uuid::Uuid::new_v4())
}
