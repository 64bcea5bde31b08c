//! Directory operations for copying, overlaying, moving and removing trees.
//!
//! Files inside the runtime tree may still be held open for a moment by a
//! server process that was just stopped, so every single-file copy and every
//! tree removal retries a bounded number of times with a fixed delay.

use crate::constants::{FILE_COPY_ATTEMPTS, FILE_COPY_RETRY_DELAY_MS};
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, warn};
use walkdir::WalkDir;

fn retry_strategy() -> impl Iterator<Item = std::time::Duration> {
    FixedInterval::from_millis(FILE_COPY_RETRY_DELAY_MS).take(FILE_COPY_ATTEMPTS - 1)
}

/// Create `path` and its parents, failing if it exists as a file.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Copy one file, retrying while the OS reports the source or target busy.
pub async fn copy_file_with_retry(src: &Path, dst: &Path) -> Result<u64> {
    Retry::spawn(retry_strategy(), || async {
        fs::copy(src, dst).await.inspect_err(|e| {
            debug!("Copy {} -> {} failed: {}", src.display(), dst.display(), e);
        })
    })
    .await
    .with_context(|| {
        format!(
            "Failed to copy file from {} to {} after {} attempts",
            src.display(),
            dst.display(),
            FILE_COPY_ATTEMPTS
        )
    })
}

/// Copy every file under `src` onto `dst`, preserving relative paths.
///
/// Existing files in `dst` are overwritten and nothing outside the copied
/// paths is deleted, so this doubles as the overlay step of an install.
/// Symlinks are skipped. Returns the number of files copied.
pub async fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    ensure_dir(dst).await?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("Entry escaped its root: {}", entry.path().display()))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            ensure_dir(&target).await?;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                ensure_dir(parent).await?;
            }
            copy_file_with_retry(entry.path(), &target).await?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Remove a directory tree if it exists, retrying on transient failures.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    Retry::spawn(retry_strategy(), || async {
        match fs::remove_dir_all(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    })
    .await
    .with_context(|| format!("Failed to remove directory: {}", path.display()))
}

/// Move a directory, falling back to copy-then-delete across filesystems.
pub async fn move_dir(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent).await?;
    }
    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(
                "Rename {} -> {} failed ({}), falling back to copy",
                src.display(),
                dst.display(),
                e
            );
            copy_tree(src, dst).await?;
            remove_dir_all(src).await
        }
    }
}

/// Write `content` to a sibling temp file and rename it over `path`.
pub async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .await
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}
