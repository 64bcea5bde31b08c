//! In-memory stand-ins for the transport, process and disk seams.

use crate::core::HostError;
use crate::fetch::transport::{HttpResponse, HttpTransport, status_error};
use crate::process::{ProcessBackend, ProcessInfo};
use crate::updater::DiskSpace;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Get,
    Download,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub url: String,
    pub started_at: Instant,
}

/// Scripted HTTP transport.
///
/// Metadata responses are queued per URL; the last queued response repeats.
/// Unscripted URLs fail like an unreachable host.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    downloads: Mutex<HashMap<String, Result<Vec<u8>, u16>>>,
    calls: Mutex<Vec<RecordedCall>>,
    get_delay: Mutex<Duration>,
    credentials: AtomicBool,
    download_hooks: Mutex<HashMap<String, DownloadHook>>,
}

/// Runs with the destination path before a scripted download resolves.
pub type DownloadHook = Arc<dyn Fn(&Path) + Send + Sync>;

impl FakeTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.respond_sequence(url, vec![response]);
    }

    pub fn respond_sequence(&self, url: &str, responses: Vec<HttpResponse>) {
        self.responses.lock().unwrap().insert(url.to_string(), responses.into());
    }

    pub fn serve_download(&self, url: &str, body: Vec<u8>) {
        self.downloads.lock().unwrap().insert(url.to_string(), Ok(body));
    }

    pub fn fail_download(&self, url: &str, status: u16) {
        self.downloads.lock().unwrap().insert(url.to_string(), Err(status));
    }

    /// Run `hook` with the destination path whenever `url` is downloaded.
    pub fn on_download(&self, url: &str, hook: impl Fn(&Path) + Send + Sync + 'static) {
        self.download_hooks.lock().unwrap().insert(url.to_string(), Arc::new(hook));
    }

    /// Make every metadata GET take `delay` after it starts.
    pub fn set_get_delay(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = delay;
    }

    pub fn set_credentials(&self, present: bool) {
        self.credentials.store(present, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.url == url).count()
    }

    #[must_use]
    pub fn call_starts(&self, url: &str) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().filter(|c| c.url == url).map(|c| c.started_at).collect()
    }

    fn record(&self, kind: CallKind, url: &str) {
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            url: url.to_string(),
            started_at: Instant::now(),
        });
    }

    fn unreachable(url: &str) -> HostError {
        HostError::TransientNetwork {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, HostError> {
        self.record(CallKind::Get, url);
        let delay = *self.get_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(url).ok_or_else(|| Self::unreachable(url))?;
        let response = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
        response.ok_or_else(|| Self::unreachable(url))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, HostError> {
        self.record(CallKind::Download, url);
        let hook = self.download_hooks.lock().unwrap().get(url).cloned();
        if let Some(hook) = hook {
            hook(dest);
        }
        let scripted = self.downloads.lock().unwrap().get(url).cloned();

        match scripted {
            Some(Ok(body)) => {
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(dest, &body).await?;
                Ok(body.len() as u64)
            }
            Some(Err(status)) => Err(status_error(url, status, None)),
            None => Err(Self::unreachable(url)),
        }
    }

    fn has_credentials(&self, _url: &str) -> bool {
        self.credentials.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct FakeProcess {
    pid: u32,
    name: String,
    started_at: SystemTime,
}

/// In-memory process table.
#[derive(Debug)]
pub struct FakeProcessBackend {
    processes: Mutex<Vec<FakeProcess>>,
    next_pid: AtomicU32,
    ignore_terminate: AtomicBool,
    ignore_kill: AtomicBool,
    fail_spawn: AtomicBool,
    exit_on_spawn: AtomicBool,
    terminations: AtomicUsize,
    kills: AtomicUsize,
    spawns: AtomicUsize,
}

impl Default for FakeProcessBackend {
    fn default() -> Self {
        Self {
            processes: Mutex::new(Vec::new()),
            next_pid: AtomicU32::new(1000),
            ignore_terminate: AtomicBool::new(false),
            ignore_kill: AtomicBool::new(false),
            fail_spawn: AtomicBool::new(false),
            exit_on_spawn: AtomicBool::new(false),
            terminations: AtomicUsize::new(0),
            kills: AtomicUsize::new(0),
            spawns: AtomicUsize::new(0),
        }
    }
}

impl FakeProcessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process named `name` that started `age` ago.
    pub fn add_running(&self, name: &str, age: Duration) -> u32 {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.processes.lock().unwrap().push(FakeProcess {
            pid,
            name: name.to_string(),
            started_at: SystemTime::now() - age,
        });
        pid
    }

    pub fn ignore_terminate(&self, ignore: bool) {
        self.ignore_terminate.store(ignore, Ordering::SeqCst);
    }

    pub fn ignore_kill(&self, ignore: bool) {
        self.ignore_kill.store(ignore, Ordering::SeqCst);
    }

    /// Make `spawn` return an error.
    pub fn fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Make spawned processes exit immediately.
    pub fn exit_on_spawn(&self, exit: bool) {
        self.exit_on_spawn.store(exit, Ordering::SeqCst);
    }

    #[must_use]
    pub fn running_count(&self) -> usize {
        self.processes.lock().unwrap().len()
    }

    #[must_use]
    pub fn terminate_count(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    fn remove(&self, pid: u32) -> bool {
        let mut processes = self.processes.lock().unwrap();
        let before = processes.len();
        processes.retain(|p| p.pid != pid);
        processes.len() != before
    }
}

impl ProcessBackend for FakeProcessBackend {
    fn find(&self, name: &str) -> Vec<ProcessInfo> {
        self.processes
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.name == name)
            .map(|p| ProcessInfo {
                pid: p.pid,
                started_at: p.started_at,
            })
            .collect()
    }

    fn terminate(&self, pid: u32) -> bool {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        if self.ignore_terminate.load(Ordering::SeqCst) {
            return true;
        }
        self.remove(pid)
    }

    fn kill(&self, pid: u32) -> bool {
        self.kills.fetch_add(1, Ordering::SeqCst);
        if self.ignore_kill.load(Ordering::SeqCst) {
            return true;
        }
        self.remove(pid)
    }

    fn spawn(&self, executable: &Path, _args: &[String], _cwd: &Path) -> Result<u32, HostError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(HostError::process("start", "spawn refused"));
        }
        let name = executable.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if self.exit_on_spawn.load(Ordering::SeqCst) {
            return Ok(self.next_pid.fetch_add(1, Ordering::SeqCst));
        }
        Ok(self.add_running(&name, Duration::ZERO))
    }
}

/// Disk probe reporting a fixed amount of free space.
#[derive(Debug, Clone, Copy)]
pub struct FixedDiskSpace(pub Option<u64>);

impl FixedDiskSpace {
    #[must_use]
    pub const fn plenty() -> Self {
        Self(Some(u64::MAX))
    }
}

impl DiskSpace for FixedDiskSpace {
    fn available_bytes(&self, _path: &Path) -> Option<u64> {
        self.0
    }
}
