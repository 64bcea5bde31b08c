//! Carrying operator-edited config files across a plugin reinstall.
//!
//! A fresh plugin archive ships default config files that overwrite the
//! operator's edits. After install, each preserved file is put back from the
//! backup and the freshly installed default is kept beside it as `<name>.new`.

use crate::utils::fs::{copy_file_with_retry, ensure_dir};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sibling path used for the freshly installed copy: `fika.jsonc.new`.
#[must_use]
pub fn new_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".new");
    path.with_file_name(name)
}

/// Restore each of `relative_paths` from `backup_root` into `live_root`.
///
/// Files absent from the backup were never customized and are left as
/// installed. Returns the relative paths that were restored.
pub async fn restore_preserved(
    backup_root: &Path,
    live_root: &Path,
    relative_paths: &[String],
) -> Result<Vec<String>> {
    let mut restored = Vec::new();

    for relative in relative_paths {
        let saved = backup_root.join(relative);
        if !saved.is_file() {
            debug!("No preserved copy of {}", relative);
            continue;
        }

        let live = live_root.join(relative);
        if let Some(parent) = live.parent() {
            ensure_dir(parent).await?;
        }
        if live.is_file() {
            copy_file_with_retry(&live, &new_sibling(&live)).await?;
        }
        copy_file_with_retry(&saved, &live).await?;
        info!("Restored preserved config {}", relative);
        restored.push(relative.clone());
    }

    Ok(restored)
}
