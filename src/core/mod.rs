//! Core types shared by every hostkeep component.
//!
//! Currently this is the error taxonomy and its operator-facing rendering.
//! See [`error`] for the categories and how each component propagates them.

pub mod error;

pub use error::{ErrorContext, HostError, user_friendly_error};

/// Result alias for operations that fail with a typed [`HostError`].
pub type HostResult<T> = std::result::Result<T, HostError>;
