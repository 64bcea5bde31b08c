//! Free-space probe for the pre-flight check.

use std::path::{Path, PathBuf};

pub trait DiskSpace: Send + Sync {
    /// Free bytes on the filesystem holding `path`, if it can be determined.
    fn available_bytes(&self, path: &Path) -> Option<u64>;
}

/// `sysinfo`-backed probe: the disk with the longest mount point that
/// contains `path` wins.
#[derive(Debug, Default)]
pub struct SystemDiskSpace;

impl DiskSpace for SystemDiskSpace {
    fn available_bytes(&self, path: &Path) -> Option<u64> {
        let target = existing_ancestor(path);
        let canonical = std::fs::canonicalize(&target).unwrap_or(target);
        let disks = sysinfo::Disks::new_with_refreshed_list();

        disks
            .list()
            .iter()
            .filter(|disk| canonical.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(sysinfo::Disk::available_space)
    }
}

/// The work directory may not exist before the first session.
fn existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| p.exists())
        .map_or_else(|| path.to_path_buf(), Path::to_path_buf)
}

/// Bytes that must be free before a download of `expected` bytes.
#[must_use]
pub fn required_bytes(expected: u64, factor: f64) -> u64 {
    (expected as f64 * factor).ceil() as u64
}
