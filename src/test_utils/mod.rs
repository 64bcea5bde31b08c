//! Test utilities for hostkeep
//!
//! Fakes for the three outside dependencies of the engine (HTTP, the
//! process table, free disk space) plus helpers for building archives and
//! comparing directory trees.
//!
//! # Example
//!
//! ```rust,no_run
//! use hostkeep_cli::fetch::HttpResponse;
//! use hostkeep_cli::test_utils::{FakeTransport, zip_bytes};
//!
//! let transport = FakeTransport::new();
//! transport.respond("https://feed.example.com", HttpResponse::ok("[]"));
//! transport.serve_download("https://dl.example.com/a.zip", zip_bytes(&[("a.txt", "a")]));
//! ```

pub mod fakes;

pub use fakes::{
    CallKind, DownloadHook, FakeProcessBackend, FakeTransport, FixedDiskSpace, RecordedCall,
};

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, else `RUST_LOG`, else stays silent.
///
/// ```bash
/// RUST_LOG=hostkeep_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Build an in-memory zip archive from `(path, contents)` pairs.
///
/// Paths ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    for (path, contents) in entries {
        if path.ends_with('/') {
            writer.add_directory(*path, options).expect("add zip directory");
        } else {
            writer.start_file(*path, options).expect("start zip entry");
            writer.write_all(contents.as_bytes()).expect("write zip entry");
        }
    }

    writer.finish().expect("finish zip").into_inner()
}

/// Relative path → contents for every entry under `root`.
///
/// Directories map to `None`, so empty folders take part in comparisons.
pub fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    let mut tree = BTreeMap::new();
    if !root.exists() {
        return tree;
    }
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.expect("walk tree");
        let relative = entry.path().strip_prefix(root).expect("relative path").to_path_buf();
        let contents = if entry.file_type().is_dir() {
            None
        } else {
            Some(std::fs::read(entry.path()).expect("read file"))
        };
        tree.insert(relative, contents);
    }
    tree
}
