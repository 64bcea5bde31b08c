//! Helpers shared by the subcommands.

use crate::config::HostConfig;
use crate::service::HostService;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Build the production service for `config`.
pub fn service(config: &HostConfig) -> Result<HostService> {
    HostService::new(config).context("Failed to initialize the update engine")
}

/// Whether a command argument is a download URL rather than a catalog id.
#[must_use]
pub fn is_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Render an uptime as `1d 2h 3m`, dropping leading zero units.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let (days, hours, minutes, seconds) =
        (total / 86_400, (total % 86_400) / 3600, (total % 3600) / 60, total % 60);

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
