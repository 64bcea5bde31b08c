//! Filesystem, archive and retry helpers shared by the updater and installer.
//!
//! # Modules
//!
//! - [`fs`] - directory copy, overlay and removal with lock-race retries, atomic writes
//! - [`archive`] - zip extraction into a staging directory
//! - [`slug`] - filesystem-safe install identities derived from package names
//! - [`backoff`] - delay schedules for the fetch retry loop
//! - [`temp`] - scratch directories removed on drop

pub mod archive;
pub mod backoff;
pub mod fs;
pub mod slug;
pub mod temp;

pub use archive::extract_zip;
pub use fs::{atomic_write, copy_tree, ensure_dir, move_dir, remove_dir_all};
pub use slug::{slugify, validate_slug};
pub use temp::ScratchDir;
