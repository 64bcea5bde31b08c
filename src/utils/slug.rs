//! Install identities derived from package display names.
//!
//! A slug is the directory name a mod is installed under and the key used to
//! detect it later, so it must be stable and filesystem safe: lowercase ASCII
//! alphanumerics separated by single hyphens.

use crate::core::HostError;

/// Derive a slug from a display name.
///
/// ASCII letters and digits are lowercased and kept; every run of any other
/// characters collapses to one `-`; leading and trailing hyphens are trimmed.
///
/// # Errors
///
/// Returns [`HostError::InvalidSlug`] when nothing usable remains.
pub fn slugify(name: &str) -> Result<String, HostError> {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        return Err(HostError::InvalidSlug {
            slug: name.to_string(),
        });
    }
    Ok(slug)
}

/// Check that `slug` is already in canonical form.
///
/// Rejects anything `slugify` would change, which rules out path separators,
/// `..`, whitespace and uppercase.
pub fn validate_slug(slug: &str) -> Result<(), HostError> {
    match slugify(slug) {
        Ok(canonical) if canonical == slug => Ok(()),
        _ => Err(HostError::InvalidSlug {
            slug: slug.to_string(),
        }),
    }
}
