//! Shared harness for integration tests.
//!
//! `TestHost` lays out a throwaway runtime tree, state and work directories
//! under one `TempDir` and wires a [`HostService`] around the in-memory
//! transport, process table and disk probe from `test_utils`.

#![allow(dead_code)]

use hostkeep_cli::config::HostConfig;
use hostkeep_cli::fetch::HttpResponse;
use hostkeep_cli::service::HostService;
use hostkeep_cli::test_utils::{FakeProcessBackend, FakeTransport, FixedDiskSpace, init_test_logging};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const SERVER_EXE: &str = "Server.bin";
pub const ENGINE_FEED: &str = "https://api.github.com/repos/test/engine/releases";
pub const PLUGIN_FEED: &str = "https://api.github.com/repos/test/plugin/releases";
pub const CATALOG: &str = "https://forge.test/api/v0";

pub struct TestHost {
    pub temp: TempDir,
    pub config: HostConfig,
    pub transport: Arc<FakeTransport>,
    pub processes: Arc<FakeProcessBackend>,
    pub disk: FixedDiskSpace,
}

impl TestHost {
    /// A host with a populated runtime tree and fast timings.
    pub fn new() -> Self {
        init_test_logging(None);
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let mut config = HostConfig {
            runtime_dir: root.join("server"),
            work_dir: Some(root.join("work")),
            state_dir: Some(root.join("state")),
            ..HostConfig::default()
        };
        config.server.executable = SERVER_EXE.to_string();
        config.server.warm_up_secs = 0;
        config.server.stop_timeout_secs = 1;
        config.server.settle_secs = 0;
        config.engine.feed_url = ENGINE_FEED.to_string();
        config.engine.min_download_bytes = 16;
        config.plugin.feed_url = PLUGIN_FEED.to_string();
        config.plugin.min_download_bytes = 16;
        config.mods.catalog_url = CATALOG.to_string();
        config.fetch.min_interval_ms = 0;
        config.fetch.backoff_unit_ms = 1;

        let host = Self {
            temp,
            config,
            transport: Arc::new(FakeTransport::new()),
            processes: Arc::new(FakeProcessBackend::new()),
            disk: FixedDiskSpace::plenty(),
        };
        host.write_runtime(SERVER_EXE, "#!/bin/sh\n");
        host.write_runtime("config/server.json", r#"{"port": 6969}"#);
        host.write_runtime("user/mods/existing-mod/package.json", "{}");
        host
    }

    pub fn service(&self) -> HostService {
        HostService::with_parts(
            &self.config,
            self.transport.clone(),
            self.processes.clone(),
            Arc::new(self.disk),
        )
    }

    pub fn runtime(&self) -> PathBuf {
        self.config.runtime_dir()
    }

    pub fn work(&self) -> PathBuf {
        self.config.work_dir()
    }

    pub fn write_runtime(&self, relative: &str, content: &str) {
        let path = self.runtime().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn read_runtime(&self, relative: &str) -> String {
        std::fs::read_to_string(self.runtime().join(relative)).unwrap()
    }

    pub fn set_installed(&self, kind: hostkeep_cli::models::ArtifactKind, version: &str) {
        let path = self.config.version_file(kind);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("{version}\n")).unwrap();
    }

    /// Pretend the server has been up for a minute.
    pub fn start_server(&self) -> u32 {
        self.processes.add_running(SERVER_EXE, Duration::from_secs(60))
    }

    /// Publish a release feed with one archive asset per release.
    pub fn publish(&self, feed: &str, releases: &[(&str, &str, &str)]) {
        let body: Vec<serde_json::Value> = releases
            .iter()
            .map(|(tag, asset, url)| {
                serde_json::json!({
                    "tag_name": tag,
                    "name": tag,
                    "body": format!("Release {tag}"),
                    "draft": false,
                    "prerelease": false,
                    "assets": [{"name": asset, "browser_download_url": url, "size": 1024}],
                })
            })
            .collect();
        self.transport.respond(feed, HttpResponse::ok(serde_json::to_string(&body).unwrap()));
    }

    /// Number of session or mod scratch directories left in the work dir.
    pub fn leftover_scratch(&self) -> usize {
        scratch_entries(&self.work())
    }
}

fn scratch_entries(work: &Path) -> usize {
    std::fs::read_dir(work).map(|entries| entries.count()).unwrap_or(0)
}
