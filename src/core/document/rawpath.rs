//! Paths over raw nodes
//!
//! Content no model describes stays below the top-level node of its
//! namespace in wire shape: property attributes and elements, `rdf:Seq`,
//! `rdf:Bag` or `rdf:Alt` containers of `rdf:li` items, and resource structs.
//! These helpers give that content the same path semantics as models.

use crate::core::context::Context;
use crate::core::error::XmpResult;
use crate::core::flags::SyncFlags;
use crate::core::namespace::{ns, NamespaceScope};
use crate::core::node::{NodeId, QName, Tree};
use crate::core::xpath::{Path, Qualifier, Segment};
use crate::model::path::{check_index, require, unsupported, Outcome};
use crate::types::array::X_DEFAULT;
use crate::types::value::{PathValue, PathValueList};

/// Namespace resolution for raw paths
pub(crate) struct RawNames<'a> {
    pub ctx: &'a Context,
    pub scope: &'a NamespaceScope,
}

impl RawNames<'_> {
    fn qname(&self, segment: &Segment, active: Option<&str>) -> Option<QName> {
        let prefix = segment.prefix().or(active)?;
        let namespace = self.scope.lookup(self.ctx.registry(), prefix)?;
        Some(QName::new(namespace.uri(), segment.local()))
    }

    fn segment(&self, name: &QName) -> Option<Segment> {
        let prefix = self.scope.prefix_for(self.ctx.registry(), &name.space)?;
        Some(Segment::new(format!("{}:{}", prefix, name.local)))
    }
}

/// Read the value at `path` below the raw top-level node `top`
pub(crate) fn get(names: &RawNames<'_>, tree: &Tree, top: NodeId, path: &Path) -> Option<String> {
    let segments = path.segments();
    let mut node = top;
    let mut active = None;
    for (i, segment) in segments.iter().enumerate() {
        let name = names.qname(segment, active)?;
        let body = struct_body(tree, node);
        let last = i + 1 == segments.len();
        if last && segment.qualifier().is_none() {
            if let Some(value) = tree[body].attr(&name.space, &name.local) {
                return Some(value.to_string());
            }
        }
        let child = tree.find_child(body, |n| n.name == name)?;
        let target = match container(tree, child) {
            Some(array) => select_item(tree, array, segment.qualifier())?,
            None if segment.lang().is_none() && segment.index().unwrap_or(0) == 0 => child,
            None => return None,
        };
        if last {
            return Some(leaf_text(tree, target));
        }
        node = target;
        active = segment.prefix().or(active);
    }
    None
}

/// Write `value` at `path` below the raw top-level node `top`
///
/// Intermediate structs must exist. The last segment may create a simple
/// property, an array item or a language alternative under `CREATE`.
pub(crate) fn set(
    names: &RawNames<'_>,
    tree: &mut Tree,
    top: NodeId,
    path: &Path,
    value: &str,
    flags: SyncFlags,
) -> XmpResult<Outcome> {
    let Some((segment, parents)) = path.pop() else {
        return Ok(Outcome::NotFound);
    };
    let mut node = top;
    let mut active = None;
    for parent in parents.segments() {
        let Some(name) = names.qname(parent, active) else {
            return Ok(Outcome::NotFound);
        };
        let body = struct_body(tree, node);
        let Some(child) = tree.find_child(body, |n| n.name == name) else {
            return Ok(Outcome::NotFound);
        };
        node = match container(tree, child) {
            Some(array) => match select_item(tree, array, parent.qualifier()) {
                Some(item) => item,
                None => return Ok(Outcome::NotFound),
            },
            None => child,
        };
        active = parent.prefix().or(active);
    }
    let Some(name) = names.qname(&segment, active) else {
        return Ok(Outcome::NotFound);
    };
    let body = struct_body(tree, node);

    if segment.qualifier().is_none() {
        if let Some(current) = tree[body].attr(&name.space, &name.local).map(str::to_string) {
            if !transition(&current, value, flags, &segment)? {
                return Ok(Outcome::Unchanged);
            }
            if value.is_empty() {
                tree.remove_attr(body, &name.space, &name.local);
            } else {
                tree.set_attr(body, name, value);
            }
            return Ok(Outcome::Changed);
        }
    }

    let child = match tree.find_child(body, |n| n.name == name) {
        Some(child) => child,
        None => {
            if value.is_empty() {
                return Ok(Outcome::Unchanged);
            }
            require(flags, SyncFlags::CREATE, "create", &segment)?;
            let child = match segment.qualifier() {
                None => tree.acquire_text(name, value),
                Some(qualifier) => {
                    let child = tree.acquire(name);
                    let kind = match qualifier {
                        Qualifier::Index(_) => "Seq",
                        Qualifier::Lang(_) => "Alt",
                    };
                    let array = tree.acquire(QName::rdf(kind));
                    tree.append_child(child, array);
                    child
                }
            };
            tree.append_child(body, child);
            if segment.qualifier().is_none() {
                return Ok(Outcome::Changed);
            }
            child
        }
    };

    let Some(array) = container(tree, child) else {
        if segment.lang().is_some() || segment.index().unwrap_or(0) != 0 {
            return Ok(Outcome::NotFound);
        }
        return assign(tree, child, value, flags, &segment);
    };
    if segment.qualifier().is_none() && !tree[array].name.is_rdf("Alt") {
        return set_list(tree, child, array, value, flags, &segment);
    }
    let items = items(tree, array);
    let position = match segment.qualifier() {
        Some(Qualifier::Index(i)) => Some(*i),
        Some(Qualifier::Lang(lang)) => items
            .iter()
            .position(|&li| tree[li].attr(ns::XML, "lang") == Some(lang.as_str())),
        None => default_position(tree, array, &items),
    };
    match position {
        Some(i) if i < items.len() => {
            if value.is_empty() && flags.contains(SyncFlags::DELETE) && !tree[items[i]].value.is_empty() {
                tree.release(items[i]);
                return Ok(Outcome::Changed);
            }
            assign(tree, items[i], value, flags, &segment)
        }
        _ if value.is_empty() => Ok(Outcome::Unchanged),
        position => {
            require(flags, SyncFlags::CREATE | SyncFlags::APPEND, "append", &segment)?;
            let fill = match position {
                Some(i) => {
                    check_index(i, &segment)?;
                    i - items.len()
                }
                None => 0,
            };
            for _ in 0..fill {
                let filler = tree.acquire(QName::rdf("li"));
                tree.append_child(array, filler);
            }
            let li = tree.acquire_text(QName::rdf("li"), value);
            match segment.qualifier() {
                Some(Qualifier::Lang(lang)) => tree.set_attr(li, QName::new(ns::XML, "lang"), lang.as_str()),
                None if tree[array].name.is_rdf("Alt") => {
                    tree.set_attr(li, QName::new(ns::XML, "lang"), X_DEFAULT)
                }
                _ => {}
            }
            tree.append_child(array, li);
            Ok(Outcome::Changed)
        }
    }
}

/// All values below the raw top-level node `top`
pub(crate) fn list(names: &RawNames<'_>, tree: &Tree, top: NodeId) -> PathValueList {
    let mut out = PathValueList::new();
    walk_struct(names, tree, top, &Path::new(), &mut out);
    out
}

fn walk_struct(names: &RawNames<'_>, tree: &Tree, node: NodeId, base: &Path, out: &mut PathValueList) {
    let body = struct_body(tree, node);
    for attr in &tree[body].attrs {
        if is_syntax(&attr.name) || attr.value.is_empty() {
            continue;
        }
        if let Some(segment) = names.segment(&attr.name) {
            out.push(PathValue::new(base.join(segment), attr.value.clone()));
        }
    }
    for &child in tree.children(body) {
        if is_syntax(&tree[child].name) {
            continue;
        }
        let Some(segment) = names.segment(&tree[child].name) else {
            continue;
        };
        let path = base.join(segment);
        match container(tree, child) {
            Some(array) => {
                let alt = tree[array].name.is_rdf("Alt");
                for (i, li) in items(tree, array).into_iter().enumerate() {
                    let mut item_path = path.clone();
                    match tree[li].attr(ns::XML, "lang") {
                        Some(lang) if alt => item_path.append_index_string(lang),
                        _ => item_path.append_index(i),
                    };
                    walk_value(names, tree, li, &item_path, out);
                }
            }
            None => walk_value(names, tree, child, &path, out),
        }
    }
}

fn walk_value(names: &RawNames<'_>, tree: &Tree, node: NodeId, path: &Path, out: &mut PathValueList) {
    if is_struct(tree, node) {
        walk_struct(names, tree, node, path, out);
        return;
    }
    let text = leaf_text(tree, node);
    if !text.is_empty() {
        out.push(PathValue::new(path.clone(), text));
    }
}

fn assign(
    tree: &mut Tree,
    node: NodeId,
    value: &str,
    flags: SyncFlags,
    segment: &Segment,
) -> XmpResult<Outcome> {
    if is_struct(tree, node) {
        return Ok(Outcome::NotFound);
    }
    let current = leaf_text(tree, node);
    if !transition(&current, value, flags, segment)? {
        return Ok(Outcome::Unchanged);
    }
    tree.remove_attr(node, ns::RDF, "resource");
    tree[node].value = value.to_string();
    Ok(Outcome::Changed)
}

/// Unindexed write to an `rdf:Seq` or `rdf:Bag` property `child`
///
/// An empty value deletes the whole property. Otherwise one value is added
/// by precedence unique, append, replace, create.
fn set_list(
    tree: &mut Tree,
    child: NodeId,
    array: NodeId,
    value: &str,
    flags: SyncFlags,
    segment: &Segment,
) -> XmpResult<Outcome> {
    let items = items(tree, array);
    let texts: Vec<String> = items.iter().map(|&li| leaf_text(tree, li)).collect();
    let empty = texts.iter().all(String::is_empty);
    if value.is_empty() {
        if empty {
            return Ok(Outcome::Unchanged);
        }
        require(flags, SyncFlags::DELETE, "delete", segment)?;
        tree.release(child);
        return Ok(Outcome::Changed);
    }
    let exists = texts.iter().any(|text| text == value);
    if flags.contains(SyncFlags::UNIQUE) {
        if exists {
            return Ok(Outcome::Unchanged);
        }
        return Ok(push_item(tree, array, value));
    }
    if flags.contains(SyncFlags::APPEND) {
        return Ok(push_item(tree, array, value));
    }
    if flags.contains(SyncFlags::REPLACE) {
        if exists && items.len() == 1 {
            return Ok(Outcome::Unchanged);
        }
        for li in items {
            tree.release(li);
        }
        return Ok(push_item(tree, array, value));
    }
    if empty {
        require(flags, SyncFlags::CREATE, "create", segment)?;
        return Ok(push_item(tree, array, value));
    }
    Err(unsupported("replace, append or unique", segment, flags))
}

fn push_item(tree: &mut Tree, array: NodeId, value: &str) -> Outcome {
    let li = tree.acquire_text(QName::rdf("li"), value);
    tree.append_child(array, li);
    Outcome::Changed
}

/// Whether `flags` allow going from `current` to `value`
fn transition(current: &str, value: &str, flags: SyncFlags, segment: &Segment) -> XmpResult<bool> {
    if current == value {
        return Ok(false);
    }
    if value.is_empty() {
        require(flags, SyncFlags::DELETE, "delete", segment)?;
    } else if current.is_empty() {
        require(flags, SyncFlags::CREATE, "create", segment)?;
    } else {
        require(flags, SyncFlags::REPLACE, "replace", segment)?;
    }
    Ok(true)
}

fn is_syntax(name: &QName) -> bool {
    name.space == ns::RDF || name.space == ns::XML
}

/// Node holding the fields of a resource, itself or its `rdf:Description`
fn struct_body(tree: &Tree, node: NodeId) -> NodeId {
    tree.find_child(node, |n| n.name.is_rdf("Description"))
        .unwrap_or(node)
}

fn container(tree: &Tree, node: NodeId) -> Option<NodeId> {
    match tree.children(node) {
        [only] => {
            let name = &tree[*only].name;
            (name.is_rdf("Seq") || name.is_rdf("Bag") || name.is_rdf("Alt")).then_some(*only)
        }
        _ => None,
    }
}

fn items(tree: &Tree, array: NodeId) -> Vec<NodeId> {
    tree.children(array)
        .iter()
        .copied()
        .filter(|&li| tree[li].name.is_rdf("li"))
        .collect()
}

fn default_position(tree: &Tree, array: NodeId, items: &[NodeId]) -> Option<usize> {
    if tree[array].name.is_rdf("Alt") {
        if let Some(i) = items
            .iter()
            .position(|&li| tree[li].attr(ns::XML, "lang") == Some(X_DEFAULT))
        {
            return Some(i);
        }
    }
    Some(0)
}

fn select_item(tree: &Tree, array: NodeId, qualifier: Option<&Qualifier>) -> Option<NodeId> {
    let items = items(tree, array);
    let position = match qualifier {
        Some(Qualifier::Index(i)) => Some(*i),
        Some(Qualifier::Lang(lang)) => items
            .iter()
            .position(|&li| tree[li].attr(ns::XML, "lang") == Some(lang.as_str())),
        None => default_position(tree, array, &items),
    };
    position.and_then(|i| items.get(i).copied())
}

fn is_struct(tree: &Tree, node: NodeId) -> bool {
    let data = &tree[node];
    if container(tree, node).is_some() {
        return false;
    }
    if data.attr(ns::RDF, "parseType") == Some("Resource") {
        return true;
    }
    if data.children().iter().any(|&c| tree[c].name.is_rdf("value")) {
        return false;
    }
    !data.children().is_empty()
        || (data.value.is_empty() && data.attrs.iter().any(|a| !is_syntax(&a.name)))
}

fn leaf_text(tree: &Tree, node: NodeId) -> String {
    let data = &tree[node];
    if let Some(resource) = data.attr(ns::RDF, "resource") {
        return resource.to_string();
    }
    if let Some(value) = tree.find_child(node, |n| n.name.is_rdf("value")) {
        return tree[value].value.clone();
    }
    data.value.clone()
}
