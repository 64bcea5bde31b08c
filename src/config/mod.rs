//! Configuration for hostkeep.
//!
//! A single operator-level TOML file drives every component. See [`host`] for
//! the file format, its location and the environment overrides.

pub mod host;

pub use host::{ArtifactConfig, FetchConfig, HostConfig, ModsConfig, ServerConfig};
