//! Process table access behind a trait so the supervisor can be tested
//! without spawning real servers.

use crate::core::HostError;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, RefreshKind, Signal, System};
use tokio::process::Command;
use tracing::debug;

/// A live process matching the managed executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub started_at: SystemTime,
}

pub trait ProcessBackend: Send + Sync {
    /// All live processes whose executable name is `name`.
    fn find(&self, name: &str) -> Vec<ProcessInfo>;

    /// Ask the process to exit. Returns whether the signal was delivered.
    fn terminate(&self, pid: u32) -> bool;

    /// Force the process to exit. Returns whether the signal was delivered.
    fn kill(&self, pid: u32) -> bool;

    /// Launch `executable` detached from this process and return its pid.
    fn spawn(&self, executable: &Path, args: &[String], cwd: &Path) -> Result<u32, HostError>;
}

/// `sysinfo`-backed process table.
#[derive(Debug, Default)]
pub struct SysinfoBackend;

impl SysinfoBackend {
    fn snapshot() -> System {
        System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
        )
    }
}

/// Linux truncates process names to 15 bytes, so a prefix of that length
/// also counts as a match.
fn name_matches(candidate: &str, wanted: &str) -> bool {
    const COMM_LEN: usize = 15;
    candidate == wanted
        || (candidate.len() == COMM_LEN && wanted.len() > COMM_LEN && wanted.starts_with(candidate))
}

impl ProcessBackend for SysinfoBackend {
    fn find(&self, name: &str) -> Vec<ProcessInfo> {
        let system = Self::snapshot();
        system
            .processes()
            .iter()
            // An exited but unreaped child is not a running server
            .filter(|(_, process)| process.status() != ProcessStatus::Zombie)
            .filter(|(_, process)| {
                let by_name = name_matches(&process.name().to_string_lossy(), name);
                let by_exe = process
                    .exe()
                    .and_then(Path::file_name)
                    .is_some_and(|exe| exe.to_string_lossy() == name);
                by_name || by_exe
            })
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                started_at: UNIX_EPOCH + Duration::from_secs(process.start_time()),
            })
            .collect()
    }

    fn terminate(&self, pid: u32) -> bool {
        let system = Self::snapshot();
        match system.process(Pid::from_u32(pid)) {
            // Platforms without SIGTERM fall back to a hard kill
            Some(process) => process.kill_with(Signal::Term).unwrap_or_else(|| process.kill()),
            None => false,
        }
    }

    fn kill(&self, pid: u32) -> bool {
        let system = Self::snapshot();
        system.process(Pid::from_u32(pid)).is_some_and(sysinfo::Process::kill)
    }

    fn spawn(&self, executable: &Path, args: &[String], cwd: &Path) -> Result<u32, HostError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| HostError::process("start", format!("no async runtime: {e}")))?;
        let mut child = Command::new(executable)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HostError::process("start", format!("{}: {e}", executable.display())))?;
        let pid = child
            .id()
            .ok_or_else(|| HostError::process("start", "server exited before reporting a pid"))?;
        debug!("Spawned {} as pid {}", executable.display(), pid);

        // Reap the child so an early exit does not linger in the table
        runtime.spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(pid, %status, "Server process exited"),
                Err(e) => debug!(pid, "Failed to wait on server process: {}", e),
            }
        });
        Ok(pid)
    }
}
