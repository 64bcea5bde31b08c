//! hostkeep - update engine for a self-hosted game server
//!
//! hostkeep keeps two versioned runtime artifacts (the server engine and a
//! multiplayer plugin) current with their upstream release feeds, and
//! installs third-party mod packages into the server's runtime tree.
//!
//! # Components
//!
//! - [`fetch`] - rate-limited, TTL-cached access to upstream feeds
//! - [`version`] - version comparison, release asset selection and the
//!   persisted version files
//! - [`catalog`] - mod catalog client
//! - [`process`] - locating, stopping and starting the server process
//! - [`updater`] - the update state machine with backup and rollback
//! - [`installer`] - mod package install and uninstall
//! - [`service`] - [`HostService`](service::HostService), which wires the
//!   components around one shared fetch layer
//!
//! # Supporting Modules
//!
//! - [`config`] - operator configuration (`~/.hostkeep/config.toml`)
//! - [`core`] - error types and user-facing error rendering
//! - [`models`] - values shared between components
//! - [`utils`] - filesystem, archive, slug and backoff helpers
//! - [`cli`] - the `hostkeep` command-line interface
//!
//! # Update Session
//!
//! ```text
//! DiskSpaceCheck -> Backup -> Stop -> Download -> ValidateDownload
//!   -> Extract -> Install -> ValidateInstall -> RestoreConfig -> Restart
//! ```
//!
//! Any failure after Backup restores the snapshot and restarts the previous
//! server. A failed restore is reported separately as needing an operator.
//!
//! # Example
//!
//! ```rust,no_run
//! use hostkeep_cli::config::HostConfig;
//! use hostkeep_cli::models::ArtifactKind;
//! use hostkeep_cli::service::HostService;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = HostConfig::load().await?;
//! let service = HostService::new(&config)?;
//!
//! let info = service.check_update(ArtifactKind::Engine).await;
//! if info.update_available {
//!     let outcome = service.perform_update(ArtifactKind::Engine, None).await?;
//!     println!("{outcome}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod fetch;
pub mod installer;
pub mod models;
pub mod process;
pub mod service;
pub mod updater;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
