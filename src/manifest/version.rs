//! Box version numbers and the rule for minting the next one.
//!
//! Versions are strictly `MAJOR.MINOR.PATCH` with unsigned numeric
//! components; pre-release and build metadata are not recognised. Ordering
//! is numeric, so `0.10.0` sorts after `0.9.9`.

use std::fmt;
use std::str::FromStr;

/// Errors raised when parsing or choosing a version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// The string is not three dot-separated unsigned integers.
    #[error("invalid box version \"{value}\": {reason}")]
    Malformed {
        /// The rejected string.
        value: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An explicit version was supplied but is blank.
    #[error("explicit box version must not be empty")]
    Empty,
}

/// A numeric `MAJOR.MINOR.PATCH` box version.
///
/// # Examples
///
/// ```
/// use boxpub::manifest::BoxVersion;
///
/// let v: BoxVersion = "0.0.2".parse().unwrap();
/// assert_eq!(v.bump().to_string(), "0.1.0");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxVersion {
    major: u64,
    minor: u64,
    patch: u64,
}

impl BoxVersion {
    /// The version derived for a box family with no numeric versions yet.
    pub const FIRST: Self = Self::new(0, 0, 1);

    /// Build a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The major component.
    #[must_use]
    pub const fn major(self) -> u64 {
        self.major
    }

    /// The minor component.
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.minor
    }

    /// The patch component.
    #[must_use]
    pub const fn patch(self) -> u64 {
        self.patch
    }

    /// The version published after this one when none is given.
    ///
    /// Publishes without an explicit version always start a new minor line:
    /// MINOR goes up by one and PATCH resets to zero, whatever PATCH was.
    /// MAJOR is never changed; a new major line needs an explicit version.
    ///
    /// # Examples
    ///
    /// ```
    /// use boxpub::manifest::BoxVersion;
    ///
    /// assert_eq!(BoxVersion::new(0, 0, 2).bump(), BoxVersion::new(0, 1, 0));
    /// assert_eq!(BoxVersion::new(0, 9, 9).bump(), BoxVersion::new(0, 10, 0));
    /// assert_eq!(BoxVersion::new(2, 3, 0).bump(), BoxVersion::new(2, 4, 0));
    /// ```
    #[must_use]
    pub const fn bump(self) -> Self {
        Self::new(self.major, self.minor.saturating_add(1), 0)
    }
}

impl FromStr for BoxVersion {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| VersionError::Malformed {
            value: value.to_owned(),
            reason: reason.to_owned(),
        };
        let mut parts = value.split('.');
        let mut next = |label: &str| -> Result<u64, VersionError> {
            let part = parts
                .next()
                .ok_or_else(|| malformed(&format!("missing {label} component")))?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed(&format!("{label} component is not a number")));
            }
            part.parse()
                .map_err(|_| malformed(&format!("{label} component is out of range")))
        };
        let version = Self::new(next("major")?, next("minor")?, next("patch")?);
        if parts.next().is_some() {
            return Err(malformed("expected exactly three components"));
        }
        Ok(version)
    }
}

impl fmt::Display for BoxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The version a publish will write, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionChoice {
    /// Supplied by the caller and used verbatim.
    Explicit(String),
    /// Derived from the manifest's existing versions.
    Derived(BoxVersion),
}

impl VersionChoice {
    /// Accept a caller-supplied version.
    ///
    /// The value is not required to be numeric, so callers can overwrite any
    /// existing entry; it only has to be non-blank. Leading and trailing
    /// whitespace is stripped, since the value becomes a path segment of the
    /// box object; everything between is kept as given.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Empty`] if `value` is empty or whitespace.
    pub fn explicit(value: &str) -> Result<Self, VersionError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        Ok(Self::Explicit(trimmed.to_owned()))
    }

    /// The version string to write into the manifest and the box path.
    #[must_use]
    pub fn as_version_string(&self) -> String {
        match self {
            Self::Explicit(value) => value.clone(),
            Self::Derived(version) => version.to_string(),
        }
    }

    /// Return true when the version was derived rather than supplied.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Derived(_))
    }
}

impl fmt::Display for VersionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(value) => f.write_str(value),
            Self::Derived(version) => write!(f, "{version}"),
        }
    }
}
