//! Global constants used throughout the hostkeep codebase.
//!
//! Timeouts, size thresholds and retry parameters that more than one module
//! refers to live here so the numbers stay discoverable.

use std::time::Duration;

/// Maximum number of outbound metadata calls in flight at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 2;

/// Minimum spacing between the start of two outbound metadata calls.
pub const DEFAULT_MIN_FETCH_INTERVAL_MS: u64 = 500;

/// Cache lifetime for frequently changing feeds (15 minutes).
pub const SHORT_CACHE_TTL_SECS: u64 = 15 * 60;

/// Cache lifetime for slow-moving release feeds (2 hours).
pub const LONG_CACHE_TTL_SECS: u64 = 2 * 60 * 60;

/// Default number of attempts for a metadata fetch.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Base unit for fetch backoff. Rate limits wait `2^attempt` units, other
/// failures wait `attempt` units.
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

/// Timeout for release feed and catalog requests.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for archive downloads. Engine archives run to several hundred MB.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Free space must be at least this multiple of the expected download size.
pub const DISK_SPACE_FACTOR: f64 = 1.5;

/// Conservative download size used for the engine disk-space check.
pub const ENGINE_EXPECTED_DOWNLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Conservative download size used for the plugin disk-space check.
pub const PLUGIN_EXPECTED_DOWNLOAD_BYTES: u64 = 200 * 1024 * 1024;

/// Smallest engine archive accepted as a complete download.
pub const ENGINE_MIN_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Smallest plugin archive accepted as a complete download.
pub const PLUGIN_MIN_DOWNLOAD_BYTES: u64 = 100 * 1024;

/// Attempts for a single file copy that may race an OS file lock.
pub const FILE_COPY_ATTEMPTS: usize = 3;

/// Fixed delay between file copy attempts.
pub const FILE_COPY_RETRY_DELAY_MS: u64 = 500;

/// Grace period for the server to exit after a terminate signal.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 30;

/// Delay after stopping before the process table is re-checked.
pub const DEFAULT_SETTLE_SECS: u64 = 3;

/// Time the server needs after spawn before it serves requests.
pub const DEFAULT_WARM_UP_SECS: u64 = 10;

/// Poll interval while waiting for processes to exit.
pub const PROCESS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Config files larger than this are skipped by the uninstall sweep.
pub const MAX_SWEEP_FILE_BYTES: u64 = 1024 * 1024;

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for exponential backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Timeout for acquiring the maintenance flag lock.
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(10)
}
