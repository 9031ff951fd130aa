//! Schema versions
//!
//! Field declarations may restrict a field to a window of schema versions.
//! A zero version means "unbounded" on either side of the window.

use crate::core::error::XmpError;
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` schema version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// The zero version, meaning no bound
    pub const ZERO: Version = Version::new(0, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Check whether `self` lies in the inclusive window `[min, max]`.
    ///
    /// Zero bounds are open. A zero `self` (no active version) matches every window.
    pub fn within(&self, min: Version, max: Version) -> bool {
        if self.is_zero() {
            return true;
        }
        (min.is_zero() || *self >= min) && (max.is_zero() || *self <= max)
    }

    /// Check whether two inclusive windows share at least one version
    pub fn windows_overlap(a: (Version, Version), b: (Version, Version)) -> bool {
        let below = |hi: Version, lo: Version| !hi.is_zero() && !lo.is_zero() && hi < lo;
        !(below(a.1, b.0) || below(b.1, a.0))
    }
}

impl FromStr for Version {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('v');
        if s.is_empty() {
            return Ok(Version::ZERO);
        }
        let mut parts = [0u32; 3];
        for (i, part) in s.split('.').enumerate() {
            if i >= 3 {
                return Err(XmpError::BadValue(format!("invalid version '{}'", s)));
            }
            parts[i] = part
                .parse()
                .map_err(|_| XmpError::BadValue(format!("invalid version '{}'", s)))?;
        }
        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(self)
    }
}
