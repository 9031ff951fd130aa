//! Sync flags
//!
//! Flags gate which transitions a path mutation or a sync may perform.
//! A mutation that needs a transition the flags do not grant fails with
//! [`XmpError::UnsupportedFlags`](crate::XmpError::UnsupportedFlags).

use crate::core::error::XmpError;
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Set of permitted mutation transitions.
    ///
    /// # Example
    ///
    /// ```
    /// use xmpdoc::SyncFlags;
    ///
    /// let flags: SyncFlags = "create,replace".parse().unwrap();
    /// assert!(flags.contains(SyncFlags::CREATE | SyncFlags::REPLACE));
    /// assert_eq!(SyncFlags::DEFAULT.to_string(), "create,replace,delete,unique");
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SyncFlags: u32 {
        /// Write a destination that is absent or empty
        const CREATE = 1 << 0;
        /// Overwrite a destination that holds a value
        const REPLACE = 1 << 1;
        /// Clear a destination when the new value is empty
        const DELETE = 1 << 2;
        /// Add a list element unconditionally
        const APPEND = 1 << 3;
        /// Add a list element unless an equal one exists
        const UNIQUE = 1 << 4;
        /// Turn operational failures into silent no-ops
        const NOFAIL = 1 << 5;

        /// Create, replace, delete, and unique append
        const DEFAULT = Self::CREATE.bits() | Self::REPLACE.bits() | Self::DELETE.bits() | Self::UNIQUE.bits();
        /// Fill gaps only; existing values are never overwritten
        const MERGE = Self::CREATE.bits() | Self::UNIQUE.bits() | Self::NOFAIL.bits();
        /// Fill gaps, overwrite scalars and grow lists
        const EXTEND = Self::CREATE.bits() | Self::REPLACE.bits() | Self::APPEND.bits() | Self::NOFAIL.bits();
        /// Add values, appending to lists, never overwrite
        const ADD = Self::CREATE.bits() | Self::APPEND.bits() | Self::NOFAIL.bits();
    }
}

impl SyncFlags {
    /// Empty flags mean "use the defaults"
    pub fn or_default(self) -> Self {
        if self.is_empty() {
            SyncFlags::DEFAULT
        } else {
            self
        }
    }

    /// Whether any flag allows overwriting a non-empty destination
    pub fn can_overwrite(self) -> bool {
        self.intersects(
            SyncFlags::REPLACE | SyncFlags::DELETE | SyncFlags::APPEND | SyncFlags::UNIQUE,
        )
    }
}

const NAMED: &[(&str, SyncFlags)] = &[
    ("create", SyncFlags::CREATE),
    ("replace", SyncFlags::REPLACE),
    ("delete", SyncFlags::DELETE),
    ("append", SyncFlags::APPEND),
    ("unique", SyncFlags::UNIQUE),
    ("nofail", SyncFlags::NOFAIL),
    ("default", SyncFlags::DEFAULT),
    ("merge", SyncFlags::MERGE),
    ("extend", SyncFlags::EXTEND),
    ("add", SyncFlags::ADD),
];

impl FromStr for SyncFlags {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = SyncFlags::empty();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let lower = token.to_ascii_lowercase();
            let (_, flag) = NAMED
                .iter()
                .find(|(name, _)| *name == lower)
                .ok_or_else(|| XmpError::BadParam(format!("unknown sync flag '{}'", token)))?;
            flags |= *flag;
        }
        Ok(flags)
    }
}

impl fmt::Display for SyncFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // single flags only, so presets print as their parts
        let names: Vec<&str> = NAMED[..6]
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        f.write_str(&names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        let flags: SyncFlags = "Create, REPLACE".parse().unwrap();
        assert_eq!(flags, SyncFlags::CREATE | SyncFlags::REPLACE);

        let flags: SyncFlags = "merge".parse().unwrap();
        assert_eq!(flags, SyncFlags::MERGE);

        assert!("create,bogus".parse::<SyncFlags>().is_err());
        assert!("".parse::<SyncFlags>().unwrap().is_empty());
    }

    #[test]
    fn test_display_round_trip() {
        let flags = SyncFlags::EXTEND;
        assert_eq!(flags.to_string(), "create,replace,append,nofail");
        assert_eq!(flags.to_string().parse::<SyncFlags>().unwrap(), flags);
    }

    #[test]
    fn test_or_default() {
        assert_eq!(SyncFlags::empty().or_default(), SyncFlags::DEFAULT);
        assert_eq!(SyncFlags::APPEND.or_default(), SyncFlags::APPEND);
        assert!(SyncFlags::UNIQUE.can_overwrite());
        assert!(!SyncFlags::CREATE.can_overwrite());
    }
}
