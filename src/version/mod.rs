//! Release version handling for the engine and plugin artifacts.
//!
//! - [`comparison`] extracts `x.y.z` triples from tags and orders them
//! - [`release`] models the upstream feed and picks the download asset
//! - [`resolver`] combines both with the fetch layer into [`UpdateInfo`](crate::models::UpdateInfo)
//! - [`version_file`] persists what is actually installed

pub mod comparison;
pub mod release;
pub mod resolver;
pub mod version_file;

pub use comparison::{ReleaseVersion, extract_version, is_newer};
pub use release::{Release, ReleaseAsset, ReleaseCandidate};
pub use resolver::VersionResolver;
pub use version_file::VersionFileStore;
