//! Host configuration management for hostkeep.
//!
//! This module handles the operator configuration file (`~/.hostkeep/config.toml`)
//! which describes where the runtime tree lives, which upstream feeds to watch,
//! how to start the server, and how hard the fetch layer may hit upstreams.
//!
//! # Configuration File Location
//!
//! - `HOSTKEEP_CONFIG_PATH` if set
//! - otherwise `~/.hostkeep/config.toml`
//!
//! A missing file is not an error; every key has a default.
//!
//! # File Format
//!
//! ```toml
//! runtime_dir = "~/server"
//! github_token = "ghp_xxx"          # optional, raises the GitHub API limit
//!
//! [engine]
//! feed_url = "https://api.github.com/repos/sp-tarkov/build/releases"
//! asset_template = "SPT-{version}-*.zip"
//!
//! [plugin]
//! marker_paths = ["user/mods/fika-server"]
//!
//! [server]
//! executable = "SPT.Server.Linux"
//! warm_up_secs = 10
//!
//! [mods]
//! catalog_url = "https://forge.sp-tarkov.com/api/v0"
//!
//! [fetch]
//! min_interval_ms = 500
//! ```
//!
//! # Environment Overrides
//!
//! - `GITHUB_TOKEN` supplies the token when `github_token` is unset
//! - `HOSTKEEP_ENGINE_VERSION` / `HOSTKEEP_PLUGIN_VERSION` replace the
//!   cold-start version used before any version file exists

use crate::constants::{
    DEFAULT_BACKOFF_UNIT_MS, DEFAULT_FETCH_ATTEMPTS, DEFAULT_MAX_CONCURRENT_FETCHES,
    DEFAULT_MIN_FETCH_INTERVAL_MS, DEFAULT_SETTLE_SECS, DEFAULT_STOP_TIMEOUT_SECS,
    DEFAULT_WARM_UP_SECS, DOWNLOAD_TIMEOUT, ENGINE_EXPECTED_DOWNLOAD_BYTES,
    ENGINE_MIN_DOWNLOAD_BYTES, LONG_CACHE_TTL_SECS, METADATA_TIMEOUT,
    PLUGIN_EXPECTED_DOWNLOAD_BYTES, PLUGIN_MIN_DOWNLOAD_BYTES, SHORT_CACHE_TTL_SECS,
};
use crate::models::ArtifactKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Top-level operator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Root of the live runtime tree (the server install).
    pub runtime_dir: PathBuf,

    /// Scratch area for downloads, staging trees and backup snapshots.
    ///
    /// Defaults to a sibling of `runtime_dir` so a backup can be moved back
    /// with a rename instead of a copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Persistent state: version files and the maintenance flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Path of the maintenance flag read by the external liveness monitor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_flag: Option<PathBuf>,

    /// Token for api.github.com. Anonymous access is limited to 60 calls an hour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    #[serde(deserialize_with = "engine_section")]
    pub engine: ArtifactConfig,
    #[serde(deserialize_with = "plugin_section")]
    pub plugin: ArtifactConfig,
    pub server: ServerConfig,
    pub mods: ModsConfig,
    pub fetch: FetchConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            runtime_dir: PathBuf::from("~/server"),
            work_dir: None,
            state_dir: None,
            maintenance_flag: None,
            github_token: None,
            engine: ArtifactConfig::engine_defaults(),
            plugin: ArtifactConfig::plugin_defaults(),
            server: ServerConfig::default(),
            mods: ModsConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Per-artifact settings: where releases come from and how to validate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Release feed returning a JSON list of releases, newest first.
    pub feed_url: String,

    /// Glob for the preferred asset name; `{version}` is replaced with the tag version.
    pub asset_template: String,

    /// Product name used by the "name contains" asset fallback.
    pub product_name: String,

    /// Plain-text version file. Defaults to `<state_dir>/<kind>.version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_file: Option<PathBuf>,

    /// Version assumed before any version file exists.
    pub default_version: String,

    /// Download size assumed by the disk-space pre-flight check.
    pub expected_download_bytes: u64,

    /// Archives smaller than this are treated as truncated.
    pub min_download_bytes: u64,

    /// Paths relative to the runtime root; at least one must exist after install.
    #[serde(default)]
    pub marker_paths: Vec<String>,

    /// Operator-edited files carried forward across an install.
    #[serde(default)]
    pub preserved_configs: Vec<String>,
}

impl ArtifactConfig {
    #[must_use]
    pub fn engine_defaults() -> Self {
        Self {
            feed_url: "https://api.github.com/repos/sp-tarkov/build/releases".to_string(),
            asset_template: "SPT-{version}-*.zip".to_string(),
            product_name: "SPT".to_string(),
            version_file: None,
            default_version: "0.0.0".to_string(),
            expected_download_bytes: ENGINE_EXPECTED_DOWNLOAD_BYTES,
            min_download_bytes: ENGINE_MIN_DOWNLOAD_BYTES,
            marker_paths: Vec::new(),
            preserved_configs: Vec::new(),
        }
    }

    #[must_use]
    pub fn plugin_defaults() -> Self {
        Self {
            feed_url: "https://api.github.com/repos/project-fika/Fika-Server/releases".to_string(),
            asset_template: "Fika.Server.Release.{version}.zip".to_string(),
            product_name: "Fika".to_string(),
            version_file: None,
            default_version: "0.0.0".to_string(),
            expected_download_bytes: PLUGIN_EXPECTED_DOWNLOAD_BYTES,
            min_download_bytes: PLUGIN_MIN_DOWNLOAD_BYTES,
            marker_paths: vec![
                "user/mods/fika-server".to_string(),
                "BepInEx/plugins/Fika.Core.dll".to_string(),
                "BepInEx/plugins/Fika".to_string(),
            ],
            preserved_configs: vec!["user/mods/fika-server/assets/configs/fika.jsonc".to_string()],
        }
    }
}

/// Keys present in an `[engine]` or `[plugin]` section; absent keys keep the
/// defaults of that artifact kind.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArtifactOverrides {
    feed_url: Option<String>,
    asset_template: Option<String>,
    product_name: Option<String>,
    version_file: Option<PathBuf>,
    default_version: Option<String>,
    expected_download_bytes: Option<u64>,
    min_download_bytes: Option<u64>,
    marker_paths: Option<Vec<String>>,
    preserved_configs: Option<Vec<String>>,
}

impl ArtifactOverrides {
    fn apply(self, base: ArtifactConfig) -> ArtifactConfig {
        ArtifactConfig {
            feed_url: self.feed_url.unwrap_or(base.feed_url),
            asset_template: self.asset_template.unwrap_or(base.asset_template),
            product_name: self.product_name.unwrap_or(base.product_name),
            version_file: self.version_file.or(base.version_file),
            default_version: self.default_version.unwrap_or(base.default_version),
            expected_download_bytes: self
                .expected_download_bytes
                .unwrap_or(base.expected_download_bytes),
            min_download_bytes: self.min_download_bytes.unwrap_or(base.min_download_bytes),
            marker_paths: self.marker_paths.unwrap_or(base.marker_paths),
            preserved_configs: self.preserved_configs.unwrap_or(base.preserved_configs),
        }
    }
}

fn engine_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ArtifactConfig, D::Error> {
    Ok(ArtifactOverrides::deserialize(deserializer)?.apply(ArtifactConfig::engine_defaults()))
}

fn plugin_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ArtifactConfig, D::Error> {
    Ok(ArtifactOverrides::deserialize(deserializer)?.apply(ArtifactConfig::plugin_defaults()))
}

/// How the managed server process is started and stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Executable name, relative to the runtime root. Also the process match key.
    pub executable: String,
    /// Listen arguments passed on every start.
    pub args: Vec<String>,
    pub warm_up_secs: u64,
    pub stop_timeout_secs: u64,
    pub settle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            executable: "SPT.Server.Linux".to_string(),
            args: Vec::new(),
            warm_up_secs: DEFAULT_WARM_UP_SECS,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
            settle_secs: DEFAULT_SETTLE_SECS,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub const fn warm_up(&self) -> Duration {
        Duration::from_secs(self.warm_up_secs)
    }

    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

/// Mod catalog and runtime layout conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModsConfig {
    pub catalog_url: String,
    /// Server-side recognized root, relative to the runtime root.
    pub server_mods_root: String,
    /// Client-side recognized root, relative to the runtime root.
    pub client_plugins_root: String,
    /// Directories swept for leftover configuration on uninstall.
    pub config_dirs: Vec<String>,
}

impl Default for ModsConfig {
    fn default() -> Self {
        Self {
            catalog_url: "https://forge.sp-tarkov.com/api/v0".to_string(),
            server_mods_root: "user/mods".to_string(),
            client_plugins_root: "BepInEx/plugins".to_string(),
            config_dirs: vec!["BepInEx/config".to_string()],
        }
    }
}

/// Throttle, cache and retry settings of the shared fetch layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_concurrent: usize,
    pub min_interval_ms: u64,
    pub short_ttl_secs: u64,
    pub long_ttl_secs: u64,
    pub max_retries: u32,
    pub backoff_unit_ms: u64,
    pub metadata_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
            min_interval_ms: DEFAULT_MIN_FETCH_INTERVAL_MS,
            short_ttl_secs: SHORT_CACHE_TTL_SECS,
            long_ttl_secs: LONG_CACHE_TTL_SECS,
            max_retries: DEFAULT_FETCH_ATTEMPTS,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
            metadata_timeout_secs: METADATA_TIMEOUT.as_secs(),
            download_timeout_secs: DOWNLOAD_TIMEOUT.as_secs(),
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub const fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl HostConfig {
    /// Load from the default location, or defaults if the file is absent.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, else from the default location.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        // The file may carry an API token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// `HOSTKEEP_CONFIG_PATH`, else `~/.hostkeep/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("HOSTKEEP_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::home_state_dir()?.join("config.toml"))
    }

    fn home_state_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".hostkeep"))
    }

    /// Live runtime root with `~` expanded.
    #[must_use]
    pub fn runtime_dir(&self) -> PathBuf {
        expand(&self.runtime_dir)
    }

    /// Scratch root for update and install sessions.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        if let Some(dir) = &self.work_dir {
            return expand(dir);
        }
        let runtime = self.runtime_dir();
        match (runtime.parent(), runtime.file_name()) {
            (Some(parent), Some(name)) => {
                parent.join(format!(".{}-hostkeep-work", name.to_string_lossy()))
            }
            _ => std::env::temp_dir().join("hostkeep-work"),
        }
    }

    /// Directory holding version files and the maintenance flag.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        match &self.state_dir {
            Some(dir) => expand(dir),
            None => Self::home_state_dir().unwrap_or_else(|_| self.work_dir().join("state")),
        }
    }

    #[must_use]
    pub fn maintenance_flag_path(&self) -> PathBuf {
        match &self.maintenance_flag {
            Some(path) => expand(path),
            None => self.state_dir().join("updating.flag"),
        }
    }

    #[must_use]
    pub const fn artifact(&self, kind: ArtifactKind) -> &ArtifactConfig {
        match kind {
            ArtifactKind::Engine => &self.engine,
            ArtifactKind::Plugin => &self.plugin,
        }
    }

    #[must_use]
    pub fn version_file(&self, kind: ArtifactKind) -> PathBuf {
        match &self.artifact(kind).version_file {
            Some(path) => expand(path),
            None => self.state_dir().join(format!("{kind}.version")),
        }
    }

    /// Cold-start version: env override, else the configured default.
    #[must_use]
    pub fn default_version(&self, kind: ArtifactKind) -> String {
        let var = match kind {
            ArtifactKind::Engine => "HOSTKEEP_ENGINE_VERSION",
            ArtifactKind::Plugin => "HOSTKEEP_PLUGIN_VERSION",
        };
        std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.artifact(kind).default_version.clone())
    }

    /// Configured token, falling back to `GITHUB_TOKEN`.
    #[must_use]
    pub fn github_token(&self) -> Option<String> {
        self.github_token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }

    /// Absolute path of the server executable.
    #[must_use]
    pub fn server_executable(&self) -> PathBuf {
        self.runtime_dir().join(&self.server.executable)
    }
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
