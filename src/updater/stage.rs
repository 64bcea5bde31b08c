//! Update session stages and the per-session outcome.

use serde::Serialize;
use std::fmt;

/// States of one artifact update, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UpdateStage {
    DiskSpaceCheck,
    Backup,
    Stop,
    Download,
    ValidateDownload,
    Extract,
    Install,
    ValidateInstall,
    RestoreConfig,
    Restart,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DiskSpaceCheck => "disk space check",
            Self::Backup => "backup",
            Self::Stop => "stop",
            Self::Download => "download",
            Self::ValidateDownload => "download validation",
            Self::Extract => "extract",
            Self::Install => "install",
            Self::ValidateInstall => "install validation",
            Self::RestoreConfig => "config restore",
            Self::Restart => "restart",
        };
        f.write_str(name)
    }
}

/// How an update session ended.
///
/// This is a report, not an error: every path through the state machine
/// ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Succeeded {
        version: String,
    },
    /// The session failed at `stage`. `rolled_back` tells whether the
    /// previous tree was restored.
    Failed {
        stage: UpdateStage,
        reason: String,
        rolled_back: bool,
    },
    /// Restoring the backup failed. Needs an operator.
    RollbackFailed {
        stage: UpdateStage,
        reason: String,
        rollback_error: String,
    },
}

impl UpdateOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    #[must_use]
    pub const fn requires_operator(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }

    /// Stage that failed, if any.
    #[must_use]
    pub const fn failed_stage(&self) -> Option<UpdateStage> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed {
                stage,
                ..
            }
            | Self::RollbackFailed {
                stage,
                ..
            } => Some(*stage),
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded {
                version,
            } => write!(f, "updated to {version}"),
            Self::Failed {
                stage,
                reason,
                rolled_back: true,
            } => write!(f, "failed during {stage}: {reason} (previous version restored)"),
            Self::Failed {
                stage,
                reason,
                rolled_back: false,
            } => write!(f, "failed during {stage}: {reason}"),
            Self::RollbackFailed {
                stage,
                reason,
                rollback_error,
            } => write!(
                f,
                "failed during {stage}: {reason}; rollback also failed: {rollback_error}. Manual intervention required"
            ),
        }
    }
}
