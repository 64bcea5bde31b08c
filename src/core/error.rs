//! Error handling for hostkeep
//!
//! This module provides the typed error enum shared by every component and the
//! user-facing rendering used by the binary. The error system follows two rules:
//! 1. **Strongly-typed errors** so the update state machine can branch on the
//!    failure category instead of on caught exceptions
//! 2. **User-friendly messages** with an actionable suggestion for operators
//!
//! # Error Categories
//!
//! - **Upstream**: [`HostError::TransientNetwork`], [`HostError::RateLimited`],
//!   [`HostError::AuthDenied`]. The fetch layer absorbs these into "no data";
//!   they only surface from downloads.
//! - **Artifacts**: [`HostError::ValidationFailed`], [`HostError::ArchiveError`].
//!   Raised after a backup exists, these trigger a rollback.
//! - **Host**: [`HostError::ProcessControlFailed`], [`HostError::DiskSpaceInsufficient`].
//! - **Fatal**: [`HostError::RollbackFailed`] means the runtime tree could not be
//!   put back and an operator has to step in.
//!
//! Use [`user_friendly_error`] to turn any `anyhow::Error` into an
//! [`ErrorContext`] with a suggestion attached.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Every failure category the engine distinguishes.
#[derive(Error, Debug)]
pub enum HostError {
    /// Network failure that may succeed on retry.
    #[error("Network error while fetching {url}: {reason}")]
    TransientNetwork {
        url: String,
        reason: String,
    },

    /// Upstream refused the call with HTTP 429.
    #[error("Rate limited by {url}")]
    RateLimited {
        url: String,
        retry_after_secs: Option<u64>,
    },

    /// Upstream answered 401 or 403. Retrying will not help.
    #[error("Access denied by {url} (HTTP {status})")]
    AuthDenied {
        url: String,
        status: u16,
    },

    /// A downloaded or installed artifact failed a sanity check.
    #[error("Validation failed for {subject}: {reason}")]
    ValidationFailed {
        subject: String,
        reason: String,
    },

    /// Stopping or starting the managed server failed.
    #[error("Process control failed during {operation}: {reason}")]
    ProcessControlFailed {
        operation: String,
        reason: String,
    },

    /// Pre-flight check: not enough free space for the download and backup.
    #[error("Insufficient disk space: {required} bytes required, {available} bytes available")]
    DiskSpaceInsufficient {
        required: u64,
        available: u64,
    },

    /// The backup could not be restored. The runtime tree is in an unknown state.
    #[error("Rollback failed: {reason}")]
    RollbackFailed {
        reason: String,
    },

    /// Another update session holds the update lock.
    #[error("An update session is already running")]
    UpdateInProgress,

    /// A mod install slug is empty or not filesystem safe.
    #[error("Invalid install slug '{slug}'")]
    InvalidSlug {
        slug: String,
    },

    /// An archive could not be opened or extracted.
    #[error("Archive error for {path}: {reason}")]
    ArchiveError {
        path: String,
        reason: String,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{message}")]
    Other {
        message: String,
    },
}

impl HostError {
    /// Build a [`HostError::ValidationFailed`].
    pub fn validation(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`HostError::ProcessControlFailed`].
    pub fn process(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProcessControlFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`HostError::ArchiveError`].
    pub fn archive(path: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::ArchiveError {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap an arbitrary error chain as [`HostError::Other`], keeping the causes.
    pub fn other(error: &anyhow::Error) -> Self {
        Self::Other {
            message: format!("{error:#}"),
        }
    }

    /// Whether the same call may succeed if repeated.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. } | Self::RateLimited { .. })
    }

    /// Whether an operator has to act before the system can recover.
    #[must_use]
    pub const fn requires_operator(&self) -> bool {
        matches!(self, Self::AuthDenied { .. } | Self::RollbackFailed { .. })
    }
}

/// Typed errors travel through `anyhow` unchanged; anything else becomes
/// [`HostError::Other`] with its full cause chain.
impl From<anyhow::Error> for HostError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<Self>() {
            Ok(typed) => typed,
            Err(other) => Self::other(&other),
        }
    }
}

impl Clone for HostError {
    fn clone(&self) -> Self {
        match self {
            Self::TransientNetwork {
                url,
                reason,
            } => Self::TransientNetwork {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::RateLimited {
                url,
                retry_after_secs,
            } => Self::RateLimited {
                url: url.clone(),
                retry_after_secs: *retry_after_secs,
            },
            Self::AuthDenied {
                url,
                status,
            } => Self::AuthDenied {
                url: url.clone(),
                status: *status,
            },
            Self::ValidationFailed {
                subject,
                reason,
            } => Self::ValidationFailed {
                subject: subject.clone(),
                reason: reason.clone(),
            },
            Self::ProcessControlFailed {
                operation,
                reason,
            } => Self::ProcessControlFailed {
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::DiskSpaceInsufficient {
                required,
                available,
            } => Self::DiskSpaceInsufficient {
                required: *required,
                available: *available,
            },
            Self::RollbackFailed {
                reason,
            } => Self::RollbackFailed {
                reason: reason.clone(),
            },
            Self::UpdateInProgress => Self::UpdateInProgress,
            Self::InvalidSlug {
                slug,
            } => Self::InvalidSlug {
                slug: slug.clone(),
            },
            Self::ArchiveError {
                path,
                reason,
            } => Self::ArchiveError {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error is not Clone
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// An error paired with operator-facing guidance.
#[derive(Debug)]
pub struct ErrorContext {
    pub error: HostError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: HostError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(host_error) = error.downcast_ref::<HostError>() {
        return create_error_context(host_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(HostError::Other {
            message: format!("{error:#}"),
        })
        .with_suggestion("Check that the runtime directory is owned by the user running hostkeep");
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(HostError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your hostkeep config file");
    }

    // Generic error: keep the full chain for diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(HostError::Other {
        message,
    })
}

fn create_error_context(error: HostError) -> ErrorContext {
    match &error {
        HostError::AuthDenied { url, .. } if url.contains("api.github.com") => {
            ErrorContext::new(error.clone())
                .with_suggestion("Set github_token in the config file or export GITHUB_TOKEN")
                .with_details("Anonymous GitHub API access is limited to 60 requests per hour")
        }
        HostError::AuthDenied { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check the credentials configured for this upstream"),
        HostError::RateLimited { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Wait a few minutes before checking again"),
        HostError::DiskSpaceInsufficient { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Free up space on the volume holding the runtime directory")
            .with_details("The update needs room for the download and a full backup of the runtime tree"),
        HostError::RollbackFailed { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Manual intervention required: restore the runtime directory from your own backups")
            .with_details("The update failed and the automatic backup could not be put back"),
        HostError::UpdateInProgress => ErrorContext::new(error.clone())
            .with_suggestion("Wait for the running update to finish"),
        HostError::InvalidSlug { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Use a mod name with at least one ASCII letter or digit"),
        HostError::ProcessControlFailed { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check that the server executable exists and no other user owns the process"),
        _ => ErrorContext::new(error.clone()),
    }
}
