//! Release version extraction and ordering.
//!
//! Upstream tags are free-form (`v4.0.1`, `SPT 3.9.0`, `Fika-2.3.1-hotfix`), so
//! a version is whatever `major.minor.patch` triple can be found inside the
//! text. A tag with no triple is [`ReleaseVersion::Unknown`] and is never
//! considered newer than anything.

use regex::Regex;
use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?P<version>\d+\.\d+\.\d+)").ok()).as_ref()
}

/// Find the first `x.y.z` triple inside `text`.
#[must_use]
pub fn extract_version(text: &str) -> Option<String> {
    version_pattern()?
        .captures(text)
        .and_then(|caps| caps.name("version"))
        .map(|m| m.as_str().to_string())
}

/// A release version as far as it could be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseVersion {
    Numeric(Version),
    /// Literal text with no numeric triple; disables numeric comparison.
    Unknown(String),
}

impl ReleaseVersion {
    /// Parse the first numeric triple in `text`, else keep the literal text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        extract_version(text)
            .and_then(|v| Version::parse(&v).ok())
            .map_or_else(|| Self::Unknown(text.trim().to_string()), Self::Numeric)
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{v}"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Whether `candidate` is strictly newer than `current`.
///
/// Both sides numeric: tuple ordering. Unknown candidate: never newer.
/// Otherwise falls back to ordinal comparison of the raw strings.
#[must_use]
pub fn is_newer(candidate: &str, current: &str) -> bool {
    match (ReleaseVersion::parse(candidate), ReleaseVersion::parse(current)) {
        (ReleaseVersion::Unknown(_), _) => false,
        (ReleaseVersion::Numeric(a), ReleaseVersion::Numeric(b)) => {
            compare_triples(&a, &b) == Ordering::Greater
        }
        _ => candidate.trim() > current.trim(),
    }
}

fn compare_triples(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch))
}
