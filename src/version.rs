use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Placeholder used when the running cluster version cannot be determined.
pub const UNKNOWN_VERSION: &str = "(unknown)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string: {0:?} (expected vMAJOR.MINOR.PATCH)")]
    Invalid(String),
}

/// A cluster release version such as `v7.1.0` or `v8.0.0-alpha`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release tag without the leading dash.
    pub pre: Option<String>,
}

impl Version {
    pub fn parse(raw: &str) -> Result<Version, VersionError> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let (triple, pre) = match body.split_once('-') {
            Some((triple, pre)) if !pre.is_empty() => (triple, Some(pre.to_string())),
            Some(_) => return Err(VersionError::Invalid(raw.to_string())),
            None => (body, None),
        };

        let mut parts = triple.split('.');
        let mut next = || -> Result<u64, VersionError> {
            parts
                .next()
                .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| VersionError::Invalid(raw.to_string()))
        };
        let (major, minor, patch) = (next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(VersionError::Invalid(raw.to_string()));
        }

        Ok(Version {
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                // A release sorts after any of its pre-releases.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Validate a user-supplied version and return its canonical `v`-prefixed form.
pub fn normalize(raw: &str) -> Result<String, VersionError> {
    Version::parse(raw).map(|v| v.to_string())
}

/// True when the string carries no usable source version.
pub fn is_unknown(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw == UNKNOWN_VERSION || raw.eq_ignore_ascii_case("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        let a = Version::parse("v7.1.0").unwrap();
        let b = Version::parse("7.1.0").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "v7.1.0");
    }

    #[test]
    fn test_parse_prerelease() {
        let v = Version::parse("v8.0.0-alpha").unwrap();
        assert_eq!(v.pre.as_deref(), Some("alpha"));
        assert_eq!(v.to_string(), "v8.0.0-alpha");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "v7", "v7.1", "v7.1.0.1", "latest", "v7.x.0", "v7.1.0-", "v+7.1.0"] {
            assert!(Version::parse(raw).is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn test_ordering() {
        let v = |s: &str| Version::parse(s).unwrap();
        assert!(v("v6.5.0") < v("v7.1.0"));
        assert!(v("v7.1.0") < v("v7.1.1"));
        assert!(v("v7.10.0") > v("v7.9.0"));
        assert!(v("v8.0.0-alpha") < v("v8.0.0"));
        assert_eq!(v("v7.1.0").cmp(&v("7.1.0")), Ordering::Equal);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" 7.5.1 ").unwrap(), "v7.5.1");
        assert_eq!(
            normalize("nope"),
            Err(VersionError::Invalid("nope".to_string()))
        );
    }

    #[test]
    fn test_is_unknown() {
        assert!(is_unknown(""));
        assert!(is_unknown(UNKNOWN_VERSION));
        assert!(is_unknown("unknown"));
        assert!(!is_unknown("v6.5.0"));
    }
}
