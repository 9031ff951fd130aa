//! Path/value pairs
//!
//! [`PathValue`] is the flat exchange format of a document: every populated
//! value reachable by a path. Lists of them are used for listing, diffing and
//! merging documents.

use crate::core::flags::SyncFlags;
use crate::core::xpath::Path;
use std::fmt;
use std::ops::Deref;

/// A path, its value and the flags to apply when writing it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathValue {
    pub path: Path,
    pub value: String,
    /// Namespace URI of the path, when known
    pub namespace: Option<String>,
    pub flags: SyncFlags,
}

impl PathValue {
    pub fn new(path: Path, value: impl Into<String>) -> Self {
        Self {
            path,
            value: value.into(),
            namespace: None,
            flags: SyncFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: SyncFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self
    }
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.path, self.value)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Serialize for PathValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PathValue", 3)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("namespace", &self.namespace)?;
        state.end()
    }
}

/// An ordered list of path/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathValueList(Vec<PathValue>);

impl PathValueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: PathValue) {
        self.0.push(value);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = PathValue>) {
        self.0.extend(other);
    }

    /// Sort by path, then value
    pub fn sort(&mut self) {
        self.0
            .sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.value.cmp(&b.value)));
    }

    /// Drop all but the first entry for each path
    ///
    /// Expects a sorted list.
    pub fn unique(&mut self) {
        self.0.dedup_by(|b, a| a.path == b.path);
    }

    /// Entry for an exact path
    pub fn find(&self, path: &Path) -> Option<&PathValue> {
        self.0.iter().find(|pv| &pv.path == path)
    }

    /// Differences that turn `self` into `other`
    ///
    /// Paths only in `self` are marked `DELETE`, paths only in `other` are
    /// marked `CREATE` and paths with differing values are marked `REPLACE`.
    /// Entries carry the value from `self` when the path exists there, so a
    /// diff doubles as a change log. The result is sorted by path.
    pub fn diff(&self, other: &PathValueList) -> PathValueList {
        let mut a = self.clone();
        a.sort();
        a.unique();
        let mut b = other.clone();
        b.sort();
        b.unique();

        let mut out = PathValueList::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() || j < b.len() {
            let order = match (a.0.get(i), b.0.get(j)) {
                (Some(x), Some(y)) => x.path.cmp(&y.path),
                (Some(_), None) => std::cmp::Ordering::Less,
                _ => std::cmp::Ordering::Greater,
            };
            match order {
                std::cmp::Ordering::Less => {
                    out.push(a.0[i].clone().with_flags(SyncFlags::DELETE));
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(b.0[j].clone().with_flags(SyncFlags::CREATE));
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    if a.0[i].value != b.0[j].value {
                        out.push(a.0[i].clone().with_flags(SyncFlags::REPLACE));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        out
    }

    pub fn into_inner(self) -> Vec<PathValue> {
        self.0
    }
}

impl Deref for PathValueList {
    type Target = [PathValue];

    fn deref(&self) -> &[PathValue] {
        &self.0
    }
}

impl From<Vec<PathValue>> for PathValueList {
    fn from(values: Vec<PathValue>) -> Self {
        Self(values)
    }
}

impl FromIterator<PathValue> for PathValueList {
    fn from_iter<I: IntoIterator<Item = PathValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PathValueList {
    type Item = PathValue;
    type IntoIter = std::vec::IntoIter<PathValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PathValueList {
    type Item = &'a PathValue;
    type IntoIter = std::slice::Iter<'a, PathValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PathValueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pv in &self.0 {
            writeln!(f, "{}", pv)?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Serialize for PathValueList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}
