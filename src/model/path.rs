//! Path queries and mutations on models
//!
//! Paths are resolved field by field through the cached [`TypeInfo`] of each
//! record. Lists are indexed by `[n]`, language alternatives by `[lang]`,
//! maps consume the next segment as key and extension fields route the rest
//! of the path into the nested model owning its prefix.
//!
//! Internally a walk that leaves the schema yields `None` or
//! [`Outcome::NotFound`] rather than an error, so the document can fall back
//! to raw nodes for content no model describes.
//!
//! [`TypeInfo`]: crate::model::typeinfo::TypeInfo

use crate::core::context::Context;
use crate::core::error::{XmpError, XmpResult};
use crate::core::flags::SyncFlags;
use crate::core::xpath::{Path, Qualifier, Segment};
use crate::model::typeinfo::{FieldFlags, FieldInfo, TagNamespace, TypeInfo};
use crate::model::unmarshal::set_field_text;
use crate::model::{field_at, field_at_mut, Field, Kind, List, MapField, Model, Record, Text, View, ViewMut};
use crate::types::array::{AltString, X_DEFAULT};
use crate::types::extension::Extensions;
use crate::types::value::{PathValue, PathValueList};
use crate::utils::version::Version;

/// Highest list index a write may grow a list to
pub(crate) const MAX_INDEX: usize = 1 << 20;

/// Result of a mutation walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Changed,
    Unchanged,
    /// The path leaves the schema
    NotFound,
}

/// Read the value at `path`
///
/// Modeled but unset values read as an empty string.
pub fn get_model_path(ctx: &Context, model: &dyn Model, path: &Path) -> XmpResult<String> {
    lookup(ctx, model.as_record(), path)?.ok_or_else(|| XmpError::path_not_found(path))
}

/// Write `value` at `path` under `flags`; empty flags mean [`SyncFlags::DEFAULT`]
pub fn set_model_path(
    ctx: &Context,
    model: &mut dyn Model,
    path: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<()> {
    match apply(ctx, model.as_record_mut(), path, value, flags.or_default())? {
        Outcome::NotFound => Err(XmpError::path_not_found(path)),
        Outcome::Changed | Outcome::Unchanged => Ok(()),
    }
}

/// All populated values of a model, sorted by path
pub fn list_model_paths(ctx: &Context, model: &dyn Model) -> XmpResult<PathValueList> {
    let mut out = PathValueList::new();
    walk_record(ctx, model.as_record(), &Path::new(), &mut out)?;
    out.sort();
    out.unique();
    Ok(out)
}

pub(crate) fn lookup(ctx: &Context, record: &dyn Record, path: &Path) -> XmpResult<Option<String>> {
    let Some((segment, rest)) = path.pop_front() else {
        return Ok(None);
    };
    let info = ctx.types().get(record, TagNamespace::Xmp)?;
    if let Some(field_info) = info.find_segment(&segment, None, Version::ZERO) {
        let field = field_at(record, &field_info.index).ok_or_else(|| missing(&info, field_info))?;
        return lookup_field(ctx, field, &segment, &rest);
    }
    if let Some(field_info) = info.catch_all() {
        if let Some(View::Map(map)) = field_at(record, &field_info.index).map(|f| f.view()) {
            if let Some(entry) = map.entry(segment.name()) {
                return lookup_field(ctx, entry, &segment, &rest);
            }
        }
    }
    Ok(None)
}

/// Resolve `segment`'s qualifier on `field`, then the rest of the path
fn lookup_field(
    ctx: &Context,
    field: &dyn Field,
    segment: &Segment,
    rest: &Path,
) -> XmpResult<Option<String>> {
    match field.view() {
        View::List(list) => {
            if segment.lang().is_some() {
                return Ok(None);
            }
            match list.item(segment.index().unwrap_or(0)) {
                Some(item) => resolve(ctx, item, rest),
                None => Ok(Some(String::new())),
            }
        }
        View::AltText(alt) => {
            if !rest.is_empty() {
                return Ok(None);
            }
            let value = match segment.qualifier() {
                None => alt.get(X_DEFAULT),
                Some(Qualifier::Lang(lang)) => alt.get(lang),
                Some(Qualifier::Index(i)) => alt.items().get(*i).map(|item| item.value.as_str()),
            };
            Ok(Some(value.unwrap_or_default().to_string()))
        }
        _ => resolve(ctx, field, rest),
    }
}

/// Resolve the rest of a path below an unqualified value
fn resolve(ctx: &Context, field: &dyn Field, rest: &Path) -> XmpResult<Option<String>> {
    if rest.is_empty() {
        return Ok(leaf_text(field));
    }
    match field.view() {
        View::Nil => Ok(Some(String::new())),
        View::Record(record) => lookup(ctx, record, rest),
        View::Map(map) => {
            let Some((key, rest)) = rest.pop_front() else {
                return Ok(None);
            };
            match map.entry(key.name()) {
                Some(entry) => lookup_field(ctx, entry, &key, &rest),
                None => Ok(None),
            }
        }
        View::Extensions(ext) => {
            let Some(model) = rest.prefix().and_then(|prefix| ext.get(prefix)) else {
                return Ok(None);
            };
            lookup(ctx, model.as_record(), rest)
        }
        View::Scalar(_) | View::Custom(_) | View::List(_) | View::AltText(_) => Ok(None),
    }
}

/// Text of a value addressed without further segments
fn leaf_text(field: &dyn Field) -> Option<String> {
    match field.view() {
        View::Nil => Some(String::new()),
        View::Scalar(text) => Some(text.to_text()),
        View::Custom(custom) => custom.as_text().map(|text| text.to_text()),
        View::AltText(alt) => Some(alt.default_value().to_string()),
        View::List(list) => Some(list.item(0).and_then(leaf_text).unwrap_or_default()),
        View::Record(_) | View::Map(_) | View::Extensions(_) => None,
    }
}

pub(crate) fn apply(
    ctx: &Context,
    record: &mut dyn Record,
    path: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    let Some((segment, rest)) = path.pop_front() else {
        return Ok(Outcome::NotFound);
    };
    let info = ctx.types().get(record, TagNamespace::Xmp)?;
    if let Some(field_info) = info.find_segment(&segment, None, Version::ZERO) {
        let field = field_at_mut(record, &field_info.index).ok_or_else(|| missing(&info, field_info))?;
        return apply_field(ctx, field, &segment, &rest, value, flags);
    }
    if let Some(field_info) = info.catch_all() {
        let field = field_at_mut(record, &field_info.index).ok_or_else(|| missing(&info, field_info))?;
        if let ViewMut::Map(map) = field.view_mut() {
            return apply_entry(ctx, map, &segment, &rest, value, flags);
        }
    }
    Ok(Outcome::NotFound)
}

fn apply_field(
    ctx: &Context,
    field: &mut dyn Field,
    segment: &Segment,
    rest: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    match field.kind() {
        Kind::List(_) => match field.view_mut() {
            ViewMut::List(list) => apply_list(ctx, list, segment, rest, value, flags),
            _ => Err(kind_mismatch(segment)),
        },
        Kind::AltText => {
            if !rest.is_empty() {
                return Ok(Outcome::NotFound);
            }
            match field.view_mut() {
                ViewMut::AltText(alt) => apply_alt(alt, segment, value, flags),
                _ => Err(kind_mismatch(segment)),
            }
        }
        _ => assign(ctx, field, segment, rest, value, flags),
    }
}

/// Write a value addressed without qualifier
fn assign(
    ctx: &Context,
    field: &mut dyn Field,
    segment: &Segment,
    rest: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    let was_empty = field.is_empty();
    if !rest.is_empty() {
        return match field.view_mut() {
            ViewMut::Record(record) => apply(ctx, record, rest, value, flags),
            ViewMut::Map(map) => match rest.pop_front() {
                Some((key, rest)) => apply_entry(ctx, map, &key, &rest, value, flags),
                None => Ok(Outcome::NotFound),
            },
            ViewMut::Extensions(ext) => apply_extension(ctx, ext, rest, value, flags),
            _ => Ok(Outcome::NotFound),
        };
    }
    if matches!(field.kind(), Kind::Record | Kind::Map | Kind::Extensions) {
        if !value.is_empty() {
            return Err(XmpError::BadValue(format!(
                "{} is a structure and has no text value",
                segment.name()
            )));
        }
        if was_empty {
            return Ok(Outcome::Unchanged);
        }
        require(flags, SyncFlags::DELETE, "delete", segment)?;
        field.clear();
        return Ok(Outcome::Changed);
    }
    match field.view_mut() {
        ViewMut::Scalar(text) => assign_text(text, was_empty, segment, value, flags),
        ViewMut::Custom(custom) => match custom.as_text_mut() {
            Some(text) => assign_text(text, was_empty, segment, value, flags),
            None => Err(XmpError::NotSupported(format!(
                "{} has no text form",
                segment.name()
            ))),
        },
        _ => Err(kind_mismatch(segment)),
    }
}

fn assign_text(
    text: &mut dyn Text,
    was_empty: bool,
    segment: &Segment,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    if text.to_text() == value {
        return Ok(Outcome::Unchanged);
    }
    if value.is_empty() {
        if was_empty {
            return Ok(Outcome::Unchanged);
        }
        require(flags, SyncFlags::DELETE, "delete", segment)?;
    } else if was_empty {
        require(flags, SyncFlags::CREATE, "create", segment)?;
    } else {
        require(flags, SyncFlags::REPLACE, "replace", segment)?;
    }
    text.set_text(value)?;
    Ok(Outcome::Changed)
}

fn apply_list(
    ctx: &Context,
    list: &mut dyn List,
    segment: &Segment,
    rest: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    if segment.lang().is_some() {
        return Err(XmpError::BadValue(format!(
            "{} is not a language alternative",
            segment.name()
        )));
    }
    match segment.index() {
        Some(index) => apply_list_index(ctx, list, index, segment, rest, value, flags),
        None if rest.is_empty() => apply_list_whole(list, segment, value, flags),
        None => apply_list_index(ctx, list, 0, segment, rest, value, flags),
    }
}

/// Unindexed list write: delete all, or add one value by precedence
/// unique, append, replace, create
fn apply_list_whole(
    list: &mut dyn List,
    segment: &Segment,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    let empty = (0..list.len()).all(|i| list.item(i).map_or(true, |item| item.is_empty()));
    if value.is_empty() {
        if empty {
            return Ok(Outcome::Unchanged);
        }
        require(flags, SyncFlags::DELETE, "delete", segment)?;
        list.clear();
        return Ok(Outcome::Changed);
    }
    let exists = (0..list.len()).any(|i| {
        list.item(i)
            .and_then(leaf_text)
            .is_some_and(|text| text == value)
    });
    if flags.contains(SyncFlags::UNIQUE) {
        if exists {
            return Ok(Outcome::Unchanged);
        }
        return push_value(list, segment, value);
    }
    if flags.contains(SyncFlags::APPEND) {
        return push_value(list, segment, value);
    }
    if flags.contains(SyncFlags::REPLACE) {
        if exists && list.len() == 1 {
            return Ok(Outcome::Unchanged);
        }
        list.clear();
        return push_value(list, segment, value);
    }
    if empty {
        require(flags, SyncFlags::CREATE, "create", segment)?;
        return push_value(list, segment, value);
    }
    Err(unsupported("replace, append or unique", segment, flags))
}

/// Add `value` as a new item, or into the first free slot of a fixed array
fn push_value(list: &mut dyn List, segment: &Segment, value: &str) -> XmpResult<Outcome> {
    let index = if list.resizable() {
        let len = list.len();
        list.resize(len + 1)?;
        len
    } else {
        (0..list.len())
            .find(|&i| list.item(i).is_some_and(|item| item.is_empty()))
            .ok_or_else(|| XmpError::BadValue(format!("{} is full", segment.name())))?
    };
    let result = match list.item_mut(index) {
        Some(item) => set_field_text(item, value),
        None => Err(XmpError::InternalError(format!(
            "{} has no item {}",
            segment.name(),
            index
        ))),
    };
    if let Err(e) = result {
        if list.resizable() {
            list.remove(index);
        }
        return Err(e);
    }
    Ok(Outcome::Changed)
}

fn apply_list_index(
    ctx: &Context,
    list: &mut dyn List,
    index: usize,
    segment: &Segment,
    rest: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    let len = list.len();
    if index >= len {
        if value.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        if !list.resizable() {
            return Err(XmpError::BadValue(format!(
                "index {} is out of range for fixed-size array {}",
                index,
                segment.name()
            )));
        }
        if !flags.intersects(SyncFlags::CREATE | SyncFlags::APPEND) {
            return Err(unsupported("create or append", segment, flags));
        }
        check_index(index, segment)?;
        list.resize(index + 1)?;
        let result = match list.item_mut(index) {
            Some(item) => assign(ctx, item, segment, rest, value, flags | SyncFlags::CREATE),
            None => Ok(Outcome::NotFound),
        };
        if !matches!(result, Ok(Outcome::Changed)) {
            for i in (len..=index).rev() {
                list.remove(i);
            }
        }
        return result;
    }
    if rest.is_empty() && value.is_empty() {
        let item_empty = list.item(index).map_or(true, |item| item.is_empty());
        if flags.contains(SyncFlags::DELETE) {
            list.remove(index);
            return Ok(Outcome::Changed);
        }
        if item_empty {
            return Ok(Outcome::Unchanged);
        }
        return Err(unsupported("delete", segment, flags));
    }
    match list.item_mut(index) {
        Some(item) => assign(ctx, item, segment, rest, value, flags),
        None => Ok(Outcome::NotFound),
    }
}

fn apply_alt(
    alt: &mut AltString,
    segment: &Segment,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    let position = match segment.qualifier() {
        None => alt.position(X_DEFAULT),
        Some(Qualifier::Lang(lang)) => alt.position(lang),
        Some(Qualifier::Index(i)) => Some(*i).filter(|&i| i < alt.len()),
    };
    let Some(position) = position else {
        if value.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        if !flags.intersects(SyncFlags::CREATE | SyncFlags::APPEND) {
            return Err(unsupported("create", segment, flags));
        }
        match segment.qualifier() {
            None => alt.set(X_DEFAULT, value),
            Some(Qualifier::Lang(lang)) => alt.set(lang, value),
            Some(Qualifier::Index(i)) => {
                return Err(XmpError::BadValue(format!(
                    "index {} is out of range for {}",
                    i,
                    segment.name()
                )))
            }
        }
        return Ok(Outcome::Changed);
    };

    let current = alt.items()[position].value.clone();
    if current == value {
        return Ok(Outcome::Unchanged);
    }
    if value.is_empty() {
        require(flags, SyncFlags::DELETE, "delete", segment)?;
        if segment.qualifier().is_none() {
            alt.clear();
        } else {
            alt.remove_at(position);
        }
        return Ok(Outcome::Changed);
    }
    if current.is_empty() {
        require(flags, SyncFlags::CREATE, "create", segment)?;
    } else {
        require(flags, SyncFlags::REPLACE, "replace", segment)?;
    }
    let addresses_default = match segment.qualifier() {
        None => true,
        Some(Qualifier::Lang(lang)) => lang.eq_ignore_ascii_case(X_DEFAULT),
        Some(Qualifier::Index(_)) => false,
    };
    if addresses_default {
        alt.set(X_DEFAULT, value);
    } else if let Some(item) = alt.item_mut(position) {
        item.value = value.to_string();
    }
    Ok(Outcome::Changed)
}

/// Write through a map entry
///
/// A new entry is kept only when the nested write succeeds; entries left
/// empty are removed.
fn apply_entry(
    ctx: &Context,
    map: &mut dyn MapField,
    key: &Segment,
    rest: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    let name = key.name();
    if let Some(entry) = map.entry_mut(name) {
        let outcome = apply_field(ctx, entry, key, rest, value, flags)?;
        if map.entry(name).is_some_and(|e| e.is_empty()) {
            map.remove(name);
        }
        return Ok(outcome);
    }
    if value.is_empty() {
        return Ok(Outcome::Unchanged);
    }
    if !flags.intersects(SyncFlags::CREATE | SyncFlags::APPEND) {
        return Err(unsupported("create", key, flags));
    }
    let result = apply_field(ctx, map.entry_or_default(name), key, rest, value, flags);
    let keep = matches!(result, Ok(Outcome::Changed))
        && map.entry(name).is_some_and(|e| !e.is_empty());
    if !keep {
        map.remove(name);
    }
    result
}

fn apply_extension(
    ctx: &Context,
    ext: &mut Extensions,
    rest: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    let Some(prefix) = rest.prefix() else {
        return Ok(Outcome::NotFound);
    };
    if let Some(model) = ext.get_mut(prefix) {
        return apply(ctx, model.as_record_mut(), rest, value, flags);
    }
    if value.is_empty() {
        return Ok(Outcome::Unchanged);
    }
    let Some(model) = ctx
        .registry()
        .get_namespace(prefix)
        .and_then(|ns| ns.new_model())
    else {
        return Ok(Outcome::NotFound);
    };
    if !flags.contains(SyncFlags::CREATE) {
        return Err(XmpError::UnsupportedFlags(format!(
            "creating extension {} requires create (flags: {})",
            prefix, flags
        )));
    }
    ext.insert(model);
    let result = match ext.get_mut(prefix) {
        Some(model) => apply(ctx, model.as_record_mut(), rest, value, flags),
        None => Ok(Outcome::NotFound),
    };
    if !matches!(result, Ok(Outcome::Changed)) {
        ext.remove(prefix);
    }
    result
}

fn walk_record(
    ctx: &Context,
    record: &dyn Record,
    base: &Path,
    out: &mut PathValueList,
) -> XmpResult<()> {
    let info = ctx.types().get(record, TagNamespace::Xmp)?;
    for field_info in &info.fields {
        if field_info.flags.contains(FieldFlags::OMIT) && !field_info.is_catch_all() {
            continue;
        }
        let Some(field) = field_at(record, &field_info.index) else {
            continue;
        };
        if field_info.is_catch_all() {
            if let View::Map(map) = field.view() {
                for key in map.keys() {
                    if let Some(entry) = map.entry(&key) {
                        walk_field(ctx, entry, &base.join(Segment::new(key)), out)?;
                    }
                }
            }
            continue;
        }
        walk_field(ctx, field, &base.join(Segment::new(field_info.name.clone())), out)?;
    }
    Ok(())
}

fn walk_field(ctx: &Context, field: &dyn Field, path: &Path, out: &mut PathValueList) -> XmpResult<()> {
    if field.is_empty() {
        return Ok(());
    }
    match field.view() {
        View::Nil => {}
        View::Scalar(text) => out.push(PathValue::new(path.clone(), text.to_text())),
        View::Custom(custom) => {
            if let Some(text) = custom.as_text() {
                out.push(PathValue::new(path.clone(), text.to_text()));
            }
        }
        View::Record(record) => walk_record(ctx, record, path, out)?,
        View::List(list) => {
            for i in 0..list.len() {
                if let Some(item) = list.item(i) {
                    let mut item_path = path.clone();
                    item_path.append_index(i);
                    walk_field(ctx, item, &item_path, out)?;
                }
            }
        }
        View::AltText(alt) => {
            for item in alt.items().iter().filter(|item| !item.value.is_empty()) {
                let lang = if item.lang.is_empty() { X_DEFAULT } else { item.lang.as_str() };
                let mut item_path = path.clone();
                item_path.append_index_string(lang);
                out.push(PathValue::new(item_path, item.value.clone()));
            }
        }
        View::Map(map) => {
            for key in map.keys() {
                if let Some(entry) = map.entry(&key) {
                    walk_field(ctx, entry, &path.join(Segment::new(key)), out)?;
                }
            }
        }
        View::Extensions(ext) => {
            for model in ext.iter() {
                walk_record(ctx, model.as_record(), path, out)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn require(flags: SyncFlags, needed: SyncFlags, action: &str, segment: &Segment) -> XmpResult<()> {
    if flags.intersects(needed) {
        Ok(())
    } else {
        Err(unsupported(action, segment, flags))
    }
}

pub(crate) fn check_index(index: usize, segment: &Segment) -> XmpResult<()> {
    if index > MAX_INDEX {
        return Err(XmpError::BadValue(format!(
            "index {} of {} exceeds the limit of {}",
            index,
            segment.name(),
            MAX_INDEX
        )));
    }
    Ok(())
}

pub(crate) fn unsupported(action: &str, segment: &Segment, flags: SyncFlags) -> XmpError {
    XmpError::UnsupportedFlags(format!(
        "writing {} requires {} (flags: {})",
        segment, action, flags
    ))
}

fn kind_mismatch(segment: &Segment) -> XmpError {
    XmpError::InternalError(format!("{} does not match its declared kind", segment.name()))
}

fn missing(info: &TypeInfo, field: &FieldInfo) -> XmpError {
    XmpError::InternalError(format!(
        "{} has no field at {:?}",
        info.type_name, field.index
    ))
}
