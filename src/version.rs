//! Release tag normalisation and ordering
//!
//! Tags arrive as `v1.3.0`, `1.3.0`, `V1.3` and occasionally garbage. Each is
//! normalised to `v<semver>` and compared by semver precedence (build
//! metadata ignored). Unparsable tags never error: they sort below every
//! parsable tag and equal to each other, so a broken tag can only ever
//! suppress an update, not crash the check.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;

/// A release tag after normalisation
#[derive(Debug, Clone)]
pub enum ReleaseVersion {
    Valid(Version),
    Invalid(String),
}

impl ReleaseVersion {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let bare = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        match Version::parse(bare).or_else(|_| Version::parse(&pad_core(bare))) {
            Ok(v) => Self::Valid(v),
            Err(_) => Self::Invalid(trimmed.to_string()),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Canonical `v<semver>` rendering; invalid tags are returned as given
impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid(v) => write!(f, "v{v}"),
            Self::Invalid(raw) => f.write_str(raw),
        }
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseVersion {}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Valid(a), Self::Valid(b)) => a.cmp_precedence(b),
            (Self::Valid(_), Self::Invalid(_)) => Ordering::Greater,
            (Self::Invalid(_), Self::Valid(_)) => Ordering::Less,
            (Self::Invalid(_), Self::Invalid(_)) => Ordering::Equal,
        }
    }
}

/// Compare two raw tags after normalisation
pub fn compare(a: &str, b: &str) -> Ordering {
    ReleaseVersion::parse(a).cmp(&ReleaseVersion::parse(b))
}

/// An update is available iff `current < latest`
pub fn is_newer(current: &str, latest: &str) -> bool {
    compare(current, latest) == Ordering::Less
}

/// Prefix `v` when absent, leaving the rest untouched
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix('V') {
        Some(rest) => format!("v{rest}"),
        None if trimmed.starts_with('v') => trimmed.to_string(),
        None => format!("v{trimmed}"),
    }
}

/// Expand shorthand `1` / `1.2` cores to `1.0.0` / `1.2.0`, keeping any
/// pre-release or build suffix.
fn pad_core(bare: &str) -> String {
    let split = bare.find(['-', '+']).unwrap_or(bare.len());
    let (core, suffix) = bare.split_at(split);
    match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => bare.to_string(),
    }
}
