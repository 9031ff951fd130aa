//! Path language for XMP documents
//!
//! A path addresses a single value inside a document:
//!
//! ```text
//! path      := prefix ":" segment ( "/" segment )*
//! segment   := name [ "[" qualifier "]" ]
//! qualifier := integer | language-tag | <empty>
//! ```
//!
//! Examples: `xmp:CreatorTool`, `dc:creator[1]`, `dc:title[de]`,
//! `xmpMM:History[0]/stEvt:action`.
//!
//! Paths are tokenized once into typed [`Segment`]s, so a parsed [`Path`] can be
//! reused across many lookups without re-scanning the string.

use crate::core::error::{XmpError, XmpResult};
use std::fmt;
use std::str::FromStr;

/// Qualifier attached to a path segment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Qualifier {
    /// Array index, 0-based. `[]` parses as index 0.
    Index(usize),
    /// Language tag of an alternative-text entry
    Lang(String),
}

/// One `/`-separated step of a path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment {
    name: String,
    qualifier: Option<Qualifier>,
}

impl Segment {
    /// Create a segment without qualifier
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: None,
        }
    }

    /// Parse `name[qualifier]` into a segment
    ///
    /// A purely numeric qualifier is an index, an empty one is index 0, `-1` means
    /// "no index" and anything else is a language tag. Indexes below -1 are rejected.
    pub fn parse(s: &str) -> XmpResult<Self> {
        let s = s.trim();
        let (name, qualifier) = match s.find('[') {
            None => (s, None),
            Some(open) => {
                let Some(inner) = s[open + 1..].strip_suffix(']') else {
                    return Err(XmpError::InvalidPathSegment(format!(
                        "unclosed bracket in '{}'",
                        s
                    )));
                };
                (&s[..open], parse_qualifier(s, inner)?)
            }
        };
        if name.is_empty() || name.ends_with(':') || name.contains(&[']', '/'][..]) {
            return Err(XmpError::InvalidPathSegment(format!(
                "invalid segment name '{}'",
                s
            )));
        }
        Ok(Self {
            name: name.to_string(),
            qualifier,
        })
    }

    /// Full segment name, including a namespace prefix if present
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace prefix written on this segment
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Name without its namespace prefix
    pub fn local(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    pub fn index(&self) -> Option<usize> {
        match self.qualifier {
            Some(Qualifier::Index(i)) => Some(i),
            _ => None,
        }
    }

    pub fn lang(&self) -> Option<&str> {
        match &self.qualifier {
            Some(Qualifier::Lang(lang)) => Some(lang),
            _ => None,
        }
    }

    /// Copy of this segment with the qualifier replaced
    pub fn with_qualifier(&self, qualifier: Option<Qualifier>) -> Self {
        Self {
            name: self.name.clone(),
            qualifier,
        }
    }

    /// Copy of this segment carrying `prefix` unless it already has one
    pub fn qualified(&self, prefix: &str) -> Self {
        if self.prefix().is_some() || prefix.is_empty() {
            return self.clone();
        }
        Self {
            name: format!("{}:{}", prefix, self.name),
            qualifier: self.qualifier.clone(),
        }
    }
}

fn parse_qualifier(segment: &str, inner: &str) -> XmpResult<Option<Qualifier>> {
    if inner.is_empty() {
        return Ok(Some(Qualifier::Index(0)));
    }
    let digits = inner.strip_prefix('-').unwrap_or(inner);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        let index: i64 = inner.parse().map_err(|_| {
            XmpError::InvalidPathSegment(format!("index out of range in '{}'", segment))
        })?;
        return match index {
            -1 => Ok(None),
            i if i < -1 => Err(XmpError::InvalidPathSegment(format!(
                "negative index in '{}'",
                segment
            ))),
            i => Ok(Some(Qualifier::Index(i as usize))),
        };
    }
    if inner.contains(&['[', ']', '/'][..]) {
        return Err(XmpError::InvalidPathSegment(format!(
            "invalid qualifier in '{}'",
            segment
        )));
    }
    Ok(Some(Qualifier::Lang(inner.to_string())))
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match &self.qualifier {
            Some(Qualifier::Index(i)) => write!(f, "[{}]", i),
            Some(Qualifier::Lang(lang)) => write!(f, "[{}]", lang),
            None => Ok(()),
        }
    }
}

impl FromStr for Segment {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::parse(s)
    }
}

/// A parsed document path
///
/// The namespace prefix of a path is the prefix of its first segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Create an empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a path such as `dc:creator[1]` or `xmpMM:History[0]/stEvt:action`
    pub fn parse(s: &str) -> XmpResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(XmpError::InvalidPathSegment("empty path".to_string()));
        }
        let segments = split_segments(s)?
            .into_iter()
            .map(Segment::parse)
            .collect::<XmpResult<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// Build a path from already parsed segments
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Namespace prefix of the path
    pub fn prefix(&self) -> Option<&str> {
        self.segments.first().and_then(|s| s.prefix())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment strings in order
    pub fn fields(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.to_string()).collect()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Append one segment given in string form
    pub fn push(&mut self, segment: &str) -> XmpResult<&mut Self> {
        self.segments.push(Segment::parse(segment)?);
        Ok(self)
    }

    /// Append an already parsed segment
    pub fn push_segment(&mut self, segment: Segment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    /// Copy of this path extended by `segment`
    pub fn join(&self, segment: Segment) -> Path {
        let mut path = self.clone();
        path.segments.push(segment);
        path
    }

    /// Copy of this path with all segments of `other` appended
    pub fn concat(&self, other: &Path) -> Path {
        let mut path = self.clone();
        path.segments.extend(other.segments.iter().cloned());
        path
    }

    /// Remove the last segment, returning it and the remainder
    pub fn pop(&self) -> Option<(Segment, Path)> {
        let mut rest = self.clone();
        let last = rest.segments.pop()?;
        Some((last, rest))
    }

    /// Remove the first segment, returning it and the remainder
    ///
    /// When the removed segment carries a namespace prefix and the new first
    /// segment does not, the remainder inherits that prefix so it stays resolvable.
    pub fn pop_front(&self) -> Option<(Segment, Path)> {
        let (first, rest) = self.segments.split_first()?;
        let mut rest = rest.to_vec();
        if let (Some(prefix), Some(next)) = (first.prefix(), rest.first_mut()) {
            *next = next.qualified(prefix);
        }
        Some((first.clone(), Path { segments: rest }))
    }

    /// Set the index qualifier of the last segment
    pub fn append_index(&mut self, index: usize) -> &mut Self {
        if let Some(last) = self.segments.last_mut() {
            last.qualifier = Some(Qualifier::Index(index));
        }
        self
    }

    /// Set the language qualifier of the last segment
    pub fn append_index_string(&mut self, tag: &str) -> &mut Self {
        if let Some(last) = self.segments.last_mut() {
            last.qualifier = Some(Qualifier::Lang(tag.to_string()));
        }
        self
    }
}

/// Split on `/` outside of brackets
fn split_segments(s: &str) -> XmpResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    XmpError::InvalidPathSegment(format!("unexpected ']' in '{}'", s))
                })?
            }
            '/' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(XmpError::InvalidPathSegment(format!(
            "unclosed bracket in '{}'",
            s
        )));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl TryFrom<&str> for Path {
    type Error = XmpError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Path::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(self)
    }
}
