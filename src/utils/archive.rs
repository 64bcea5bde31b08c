//! Zip extraction for downloaded artifacts and mod packages.

use crate::core::HostError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions treated as release archives when choosing an asset.
pub const ARCHIVE_EXTENSIONS: [&str; 2] = [".zip", ".7z"];

/// Whether `name` looks like a release archive.
#[must_use]
pub fn is_archive_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Extract `archive` into `dest`, returning the number of files written.
///
/// Entries whose names would escape `dest` are skipped. Only zip archives
/// are supported; anything else fails with [`HostError::ArchiveError`].
pub async fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, HostError> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let display = archive.display().to_string();

    tokio::task::spawn_blocking(move || extract_zip_blocking(&archive, &dest))
        .await
        .map_err(|e| HostError::archive(&display, format!("extraction task failed: {e}")))?
}

fn extract_zip_blocking(archive: &Path, dest: &Path) -> Result<usize, HostError> {
    let file =
        File::open(archive).map_err(|e| HostError::archive(archive.display(), e.to_string()))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| HostError::archive(archive.display(), format!("not a valid zip: {e}")))?;

    std::fs::create_dir_all(dest)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| HostError::archive(archive.display(), e.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe archive entry: {}", entry.name());
            continue;
        };
        let out_path: PathBuf = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out).map_err(|e| {
            HostError::archive(archive.display(), format!("{}: {e}", out_path.display()))
        })?;
        written += 1;
    }

    debug!("Extracted {} files from {}", written, archive.display());
    Ok(written)
}
