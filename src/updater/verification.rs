//! Sanity checks on downloaded archives and installed trees.
//!
//! These are heuristics against truncated downloads and empty installs, not
//! authenticity checks. Upstream publishes no checksums, so the digest is
//! only logged for the operator.

use crate::core::HostError;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

pub struct DownloadVerifier;

impl DownloadVerifier {
    /// Reject empty files and files below `min_bytes`. Returns the size.
    pub async fn validate_size(path: &Path, min_bytes: u64) -> Result<u64, HostError> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| HostError::validation(path.display().to_string(), e.to_string()))?
            .len();

        if size == 0 {
            return Err(HostError::validation(path.display().to_string(), "downloaded file is empty"));
        }
        if size < min_bytes {
            return Err(HostError::validation(
                path.display().to_string(),
                format!("downloaded file is {size} bytes, expected at least {min_bytes}"),
            ));
        }
        Ok(size)
    }

    /// SHA-256 of the file as `sha256:<hex>`, hashed without loading it whole.
    pub async fn compute_sha256(path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {}", path.display());
        let owned = path.to_path_buf();
        let digest = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
            let mut file = std::fs::File::open(&owned)?;
            let mut hasher = Sha256::new();
            std::io::copy(&mut file, &mut hasher)?;
            Ok(hasher.finalize().to_vec())
        })
        .await
        .context("Checksum task failed")?
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Ok(format!("sha256:{}", hex::encode(digest)))
    }

    /// Size check plus a logged digest.
    pub async fn validate_download(path: &Path, min_bytes: u64) -> Result<u64, HostError> {
        let size = Self::validate_size(path, min_bytes).await?;
        match Self::compute_sha256(path).await {
            Ok(digest) => info!(size, %digest, "Download validated"),
            Err(e) => debug!("Could not hash download: {:#}", e),
        }
        Ok(size)
    }

    /// At least one marker path must exist under `root`. No markers means no check.
    pub fn validate_install(root: &Path, markers: &[String]) -> Result<(), HostError> {
        if markers.is_empty() {
            return Ok(());
        }
        if markers.iter().any(|marker| root.join(marker).exists()) {
            return Ok(());
        }
        Err(HostError::validation(
            root.display().to_string(),
            format!("none of the expected files are present: {}", markers.join(", ")),
        ))
    }
}
