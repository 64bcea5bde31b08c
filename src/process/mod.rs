//! Start, stop and liveness checks for the managed server process.
//!
//! This is a thin control surface used by the updater and status queries.
//! It does not supervise: a crashed server stays down until started again.

pub mod backend;

pub use backend::{ProcessBackend, ProcessInfo, SysinfoBackend};

use crate::config::HostConfig;
use crate::constants::PROCESS_POLL_INTERVAL;
use crate::core::HostError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct ProcessSupervisor {
    backend: Arc<dyn ProcessBackend>,
    executable: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
    warm_up: Duration,
    stop_timeout: Duration,
}

impl ProcessSupervisor {
    #[must_use]
    pub fn new(backend: Arc<dyn ProcessBackend>, config: &HostConfig) -> Self {
        Self {
            backend,
            executable: config.server_executable(),
            working_dir: config.runtime_dir(),
            args: config.server.args.clone(),
            warm_up: config.server.warm_up(),
            stop_timeout: config.server.stop_timeout(),
        }
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    fn process_name(&self) -> String {
        self.executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn processes(&self) -> Vec<ProcessInfo> {
        self.backend.find(&self.process_name())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.processes().is_empty()
    }

    /// Time since the oldest matching process started.
    #[must_use]
    pub fn uptime(&self) -> Option<Duration> {
        let oldest = self.processes().into_iter().map(|p| p.started_at).min()?;
        SystemTime::now().duration_since(oldest).ok()
    }

    /// Terminate every matching process, force-killing stragglers.
    ///
    /// Returns whether no matching process remains. A process that survives
    /// the kill is logged, not treated as an error here.
    pub async fn stop(&self, timeout: Duration) -> bool {
        let running = self.processes();
        if running.is_empty() {
            debug!("Server not running, nothing to stop");
            return true;
        }

        info!("Stopping {} server process(es)", running.len());
        for process in &running {
            if !self.backend.terminate(process.pid) {
                debug!(pid = process.pid, "Terminate signal not delivered");
            }
        }

        if self.wait_for_exit(timeout).await {
            return true;
        }

        self.kill_all().await
    }

    /// Force-kill every matching process and re-check the table.
    pub async fn kill_all(&self) -> bool {
        for process in self.processes() {
            warn!(pid = process.pid, "Force-killing server process");
            self.backend.kill(process.pid);
        }

        if self.wait_for_exit(PROCESS_POLL_INTERVAL * 4).await {
            return true;
        }
        warn!("Server process still present after force-kill");
        false
    }

    async fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_running() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(PROCESS_POLL_INTERVAL).await;
        }
    }

    /// Launch the server with the configured arguments and wait for warm-up.
    pub async fn start(&self) -> Result<(), HostError> {
        self.start_with_args(&self.args).await
    }

    pub async fn start_with_args(&self, args: &[String]) -> Result<(), HostError> {
        if !self.executable.is_file() {
            return Err(HostError::process(
                "start",
                format!("executable not found: {}", self.executable.display()),
            ));
        }
        ensure_executable(&self.executable).await?;

        let pid = self.backend.spawn(&self.executable, args, &self.working_dir)?;
        info!(pid, "Server started, warming up for {:?}", self.warm_up);
        tokio::time::sleep(self.warm_up).await;

        if !self.is_running() {
            return Err(HostError::process("start", "server exited during warm-up"));
        }
        Ok(())
    }
}

#[cfg(unix)]
async fn ensure_executable(path: &Path) -> Result<(), HostError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = tokio::fs::metadata(path).await?.permissions().mode();
    if mode & 0o111 == 0 {
        debug!("Adding execute permission to {}", path.display());
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn ensure_executable(_path: &Path) -> Result<(), HostError> {
    Ok(())
}
