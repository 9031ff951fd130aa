//! Per-type field metadata
//!
//! The first time a record type is marshaled, decoded or addressed by path,
//! its field declarations are parsed into a [`TypeInfo`] and cached for the
//! lifetime of the [`Context`](crate::Context). The cache is keyed by type and
//! tag namespace: XMP names (`dc:title`) or JSON names (`title`).

use crate::core::error::{XmpError, XmpResult};
use crate::core::xpath::Segment;
use crate::model::{Kind, Record, View};
use crate::utils::version::Version;
use bitflags::bitflags;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

bitflags! {
    /// Precomputed field properties
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u32 {
        /// Serialized as an attribute of the parent
        const ATTR = 1 << 0;
        /// Serialized even when empty
        const EMPTY = 1 << 1;
        /// Never serialized
        const OMIT = 1 << 2;
        /// Catch-all for unknown content
        const ANY = 1 << 3;
        /// Map entries are written next to the other fields
        const FLAT = 1 << 4;
        /// Value has a text form
        const TEXT = 1 << 8;
        /// Nested record
        const RECORD = 1 << 9;
        /// Array
        const ARRAY = 1 << 10;
        /// Language alternative
        const ALT = 1 << 11;
        /// String-keyed map
        const MAP = 1 << 12;
        /// Nested models
        const EXTENSIONS = 1 << 13;
        /// Own wire codec
        const CUSTOM = 1 << 14;
    }
}

/// Which names a cached type info carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagNamespace {
    Xmp,
    Json,
}

/// Metadata of one (possibly promoted) field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Index path from the record to the field, longer than one for embedded fields
    pub index: Vec<usize>,
    /// Rust identifier
    pub ident: &'static str,
    /// Serialized name
    pub name: String,
    pub flags: FieldFlags,
    pub min_version: Version,
    pub max_version: Version,
}

impl FieldInfo {
    /// Namespace prefix of the serialized name
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    /// Whether the field exists in schema version `version`
    pub fn in_version(&self, version: Version) -> bool {
        version.within(self.min_version, self.max_version)
    }

    pub fn is_attr(&self) -> bool {
        self.flags.contains(FieldFlags::ATTR)
    }

    /// Whether unknown content should be collected into this field
    pub fn is_catch_all(&self) -> bool {
        self.flags.contains(FieldFlags::MAP)
            && self.flags.intersects(FieldFlags::ANY | FieldFlags::FLAT)
    }
}

/// Field metadata of one record type
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub fields: Vec<FieldInfo>,
}

impl TypeInfo {
    /// Field serialized as `name` in `version`
    ///
    /// With no active version the newest declaration of the name wins.
    pub fn find(&self, name: &str, version: Version) -> Option<&FieldInfo> {
        newest(
            self.fields
                .iter()
                .filter(|f| f.name == name && f.in_version(version)),
        )
    }

    /// Field addressed by a path segment in `version`
    ///
    /// Tries the exact name, then the segment qualified with `active_prefix`,
    /// then a unique match on the local name.
    pub fn find_segment(
        &self,
        segment: &Segment,
        active_prefix: Option<&str>,
        version: Version,
    ) -> Option<&FieldInfo> {
        let name = segment.name();
        let usable = |f: &&FieldInfo| {
            (!f.flags.contains(FieldFlags::OMIT) || f.flags.contains(FieldFlags::ANY)) && f.in_version(version)
        };
        if let Some(f) = newest(self.fields.iter().filter(usable).filter(|f| f.name == name)) {
            return Some(f);
        }
        if let (None, Some(prefix)) = (segment.prefix(), active_prefix) {
            let qualified = format!("{}:{}", prefix, name);
            if let Some(f) = newest(self.fields.iter().filter(usable).filter(|f| f.name == qualified)) {
                return Some(f);
            }
        }
        let local = segment.local();
        let matches: Vec<&FieldInfo> = self
            .fields
            .iter()
            .filter(usable)
            .filter(|f| f.local() == local || f.ident == local)
            .collect();
        let first = matches.first()?;
        if matches.iter().all(|f| f.name == first.name) {
            newest(matches.into_iter())
        } else {
            None
        }
    }

    /// First catch-all map field
    pub fn catch_all(&self) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.is_catch_all())
    }
}

/// Of several declarations of one name, the one with the latest window
fn newest<'a>(fields: impl Iterator<Item = &'a FieldInfo>) -> Option<&'a FieldInfo> {
    fields.max_by_key(|f| f.min_version)
}

/// Cache of [`TypeInfo`] per record type and tag namespace
#[derive(Debug, Default)]
pub struct TypeCache {
    map: RwLock<HashMap<(TypeId, TagNamespace), Arc<TypeInfo>>>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type info of `record`, computed on first use
    pub fn get(&self, record: &dyn Record, tag: TagNamespace) -> XmpResult<Arc<TypeInfo>> {
        let key = (record.as_any().type_id(), tag);
        if let Some(info) = self
            .map
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(info.clone());
        }
        let info = Arc::new(build(record, tag)?);
        tracing::trace!(
            "cached type info for {} ({} fields)",
            info.type_name,
            info.fields.len()
        );
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        Ok(map.entry(key).or_insert(info).clone())
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Directive {
    name: String,
    flags: FieldFlags,
    min: Version,
    max: Version,
    embed: bool,
}

fn parse_directive(ident: &'static str, directive: &str, tag: TagNamespace) -> XmpResult<Directive> {
    let directive = directive.trim();
    let mut parts = directive.split(',').map(str::trim);
    let raw_name = parts.next().unwrap_or("");
    let mut out = Directive {
        name: String::new(),
        flags: FieldFlags::empty(),
        min: Version::ZERO,
        max: Version::ZERO,
        embed: false,
    };
    if raw_name == "-" {
        out.flags |= FieldFlags::OMIT;
    }
    for option in parts {
        match option {
            "" => {}
            "attr" => out.flags |= FieldFlags::ATTR,
            "empty" => out.flags |= FieldFlags::EMPTY,
            "omit" => out.flags |= FieldFlags::OMIT,
            "any" => out.flags |= FieldFlags::ANY,
            "flat" => out.flags |= FieldFlags::FLAT,
            "embed" => out.embed = true,
            _ => {
                if let Some(v) = option.strip_prefix("min=") {
                    out.min = v.parse()?;
                } else if let Some(v) = option.strip_prefix("max=") {
                    out.max = v.parse()?;
                } else {
                    return Err(XmpError::SchemaConflict(format!(
                        "field {}: unknown option '{}'",
                        ident, option
                    )));
                }
            }
        }
    }
    let xmp_name = if raw_name.is_empty() || raw_name == "-" {
        ident
    } else {
        raw_name
    };
    out.name = match tag {
        TagNamespace::Xmp => xmp_name.to_string(),
        TagNamespace::Json => xmp_name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(xmp_name)
            .to_string(),
    };
    Ok(out)
}

fn kind_flags(kind: Kind) -> FieldFlags {
    match kind {
        Kind::Scalar => FieldFlags::TEXT,
        Kind::Record => FieldFlags::RECORD,
        Kind::List(_) => FieldFlags::ARRAY,
        Kind::AltText => FieldFlags::ARRAY | FieldFlags::ALT,
        Kind::Map => FieldFlags::MAP,
        Kind::Extensions => FieldFlags::EXTENSIONS,
        Kind::Custom => FieldFlags::CUSTOM,
    }
}

fn build(record: &dyn Record, tag: TagNamespace) -> XmpResult<TypeInfo> {
    let mut fields = Vec::new();
    for (i, decl) in record.declarations().iter().enumerate() {
        let field = record.field(i).ok_or_else(|| {
            XmpError::InternalError(format!(
                "{} declares field {} without accessor",
                record.type_name(),
                decl.ident
            ))
        })?;
        let directive = parse_directive(decl.ident, decl.directive, tag)?;
        if directive.embed {
            let View::Record(inner) = field.view() else {
                return Err(XmpError::SchemaConflict(format!(
                    "{}.{}: only records can be embedded",
                    record.type_name(),
                    decl.ident
                )));
            };
            for mut promoted in build(inner, tag)?.fields {
                promoted.index.insert(0, i);
                fields.push(promoted);
            }
            continue;
        }
        let flags = directive.flags | kind_flags(field.kind());
        if flags.contains(FieldFlags::ATTR) && !flags.intersects(FieldFlags::TEXT | FieldFlags::CUSTOM) {
            return Err(XmpError::SchemaConflict(format!(
                "{}.{}: only scalar fields can be attributes",
                record.type_name(),
                decl.ident
            )));
        }
        fields.push(FieldInfo {
            index: vec![i],
            ident: decl.ident,
            name: directive.name,
            flags,
            min_version: directive.min,
            max_version: directive.max,
        });
    }
    check_conflicts(record.type_name(), &fields)?;
    Ok(TypeInfo {
        type_name: record.type_name(),
        fields,
    })
}

fn check_conflicts(type_name: &str, fields: &[FieldInfo]) -> XmpResult<()> {
    for (i, a) in fields.iter().enumerate() {
        if a.flags.contains(FieldFlags::OMIT) {
            continue;
        }
        for b in fields[i + 1..].iter().filter(|b| !b.flags.contains(FieldFlags::OMIT)) {
            if a.name == b.name
                && Version::windows_overlap((a.min_version, a.max_version), (b.min_version, b.max_version))
            {
                return Err(XmpError::SchemaConflict(format!(
                    "{}: fields {} and {} both serialize as {}",
                    type_name, a.ident, b.ident, a.name
                )));
            }
        }
    }
    Ok(())
}
