//! Model to node-tree encoding
//!
//! The [`Encoder`] walks models through their [`Field`] views and builds the
//! RDF node tree below an `rdf:RDF` root. Top-level fields are grouped into
//! one `rdf:Description` per namespace; nested records become resource nodes,
//! arrays become `rdf:Seq`/`rdf:Bag`/`rdf:Alt` containers.

use crate::core::context::Context;
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{ns, Namespace, NamespaceMap, NamespaceScope};
use crate::core::node::{NodeId, QName, Tree};
use crate::model::typeinfo::{FieldFlags, FieldInfo, TagNamespace};
use crate::model::{field_at, Field, Model, Record, View};
use crate::types::array::ArrayType;
use crate::utils::version::Version;
use std::sync::Arc;

/// Builds an output node tree from models
pub struct Encoder<'a> {
    ctx: &'a Context,
    tree: &'a mut Tree,
    root: NodeId,
    scope: &'a NamespaceScope,
    version: Version,
    wrappers: Vec<(String, NodeId)>,
    local: NamespaceMap,
}

impl<'a> Encoder<'a> {
    /// Encoder appending below `root`, normally an `rdf:RDF` node of `tree`
    pub fn new(
        ctx: &'a Context,
        tree: &'a mut Tree,
        root: NodeId,
        scope: &'a NamespaceScope,
        version: Version,
    ) -> Self {
        Self {
            ctx,
            tree,
            root,
            scope,
            version,
            wrappers: Vec::new(),
            local: NamespaceMap::new(),
        }
    }

    /// Output tree, for custom marshalers
    pub fn tree(&mut self) -> &mut Tree {
        &mut *self.tree
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Namespaces declared by the models encoded so far
    pub fn model_namespaces(&self) -> &NamespaceMap {
        &self.local
    }

    /// `rdf:Description` nodes in creation order
    pub fn descriptions(&self) -> Vec<NodeId> {
        self.wrappers.iter().map(|(_, id)| *id).collect()
    }

    /// Resolve a `prefix:local` name
    pub fn qname(&self, name: &str) -> XmpResult<QName> {
        let Some((prefix, local)) = name.split_once(':') else {
            return Err(XmpError::UnknownNamespace(format!(
                "name '{}' has no namespace prefix",
                name
            )));
        };
        let uri = self
            .local
            .get_by_prefix(prefix)
            .cloned()
            .or_else(|| self.scope.lookup(self.ctx.registry(), prefix))
            .map(|ns| ns.uri().to_string())
            .ok_or_else(|| XmpError::UnknownNamespace(prefix.to_string()))?;
        Ok(QName::new(uri, local))
    }

    fn note_namespaces(&mut self, namespaces: Vec<Namespace>) {
        for namespace in namespaces {
            if let Err(e) = self.local.insert(Arc::new(namespace)) {
                tracing::warn!("conflicting model namespace: {}", e);
            }
        }
    }

    /// Encode a top-level model
    pub fn marshal_model(&mut self, model: &dyn Model) -> XmpResult<()> {
        self.note_namespaces(model.namespaces());
        self.marshal_record(model.as_record(), self.root, true)?;
        Ok(())
    }

    /// Copy raw attributes and children of a top-level document node
    ///
    /// Raw elements named like an element already written for the model are
    /// merged into it, array items by position.
    pub fn copy_raw(&mut self, src: &Tree, top: NodeId) {
        let node = &src[top];
        if node.attrs.is_empty() && node.children().is_empty() {
            return;
        }
        let wrapper = self.wrapper(&node.name.space);
        for attr in &node.attrs {
            self.tree.set_attr(wrapper, attr.name.clone(), attr.value.clone());
        }
        for &child in node.children() {
            self.merge_raw(src, child, wrapper);
        }
    }

    fn merge_raw(&mut self, src: &Tree, node: NodeId, dest: NodeId) {
        let name = &src[node].name;
        let existing = if name.is_rdf("li") {
            None
        } else {
            self.tree.find_child(dest, |n| &n.name == name)
        };
        match existing {
            Some(target) => self.merge_into(src, node, target),
            None => {
                let copy = self.tree.copy_from(src, node);
                self.tree.append_child(dest, copy);
            }
        }
    }

    fn merge_into(&mut self, src: &Tree, node: NodeId, target: NodeId) {
        for attr in &src[node].attrs {
            if self.tree[target].attr(&attr.name.space, &attr.name.local).is_none() {
                self.tree.set_attr(target, attr.name.clone(), attr.value.clone());
            }
        }
        let name = &src[node].name;
        if name.space != ns::RDF || ArrayType::from_rdf_type(&name.local).is_none() {
            for &child in src[node].children() {
                self.merge_raw(src, child, target);
            }
            return;
        }
        let items = self.tree.children(target).to_vec();
        for (i, &li) in src[node].children().iter().enumerate() {
            match items.get(i) {
                Some(&item) => self.merge_into(src, li, item),
                None if src[li].children().is_empty() && src[li].value.is_empty() => {}
                None => {
                    let copy = self.tree.copy_from(src, li);
                    self.tree.append_child(target, copy);
                }
            }
        }
    }

    fn wrapper(&mut self, uri: &str) -> NodeId {
        if let Some((_, id)) = self.wrappers.iter().find(|(u, _)| u == uri) {
            return *id;
        }
        let id = self.tree.acquire(QName::rdf("Description"));
        self.tree.append_child(self.root, id);
        self.wrappers.push((uri.to_string(), id));
        id
    }

    fn target(&mut self, name: &QName, dest: NodeId, wrap: bool) -> NodeId {
        if wrap {
            self.wrapper(&name.space)
        } else {
            dest
        }
    }

    /// Encode the fields of `record` into `dest`
    ///
    /// With `wrap` set, each field goes into the description node of its
    /// namespace instead. Returns the number of child elements written.
    fn marshal_record(&mut self, record: &dyn Record, dest: NodeId, wrap: bool) -> XmpResult<usize> {
        let info = self.ctx.types().get(record, TagNamespace::Xmp)?;
        for field_info in info.fields.iter().filter(|f| f.is_attr()) {
            let value = lookup(record, field_info)?;
            self.marshal_field(value, field_info, dest, wrap)?;
        }
        let mut elements = 0;
        for field_info in info.fields.iter().filter(|f| !f.is_attr()) {
            let value = lookup(record, field_info)?;
            elements += self.marshal_field(value, field_info, dest, wrap)?;
        }
        Ok(elements)
    }

    /// Encode one field, returning the number of elements written
    pub fn marshal_field(
        &mut self,
        value: &dyn Field,
        info: &FieldInfo,
        dest: NodeId,
        wrap: bool,
    ) -> XmpResult<usize> {
        let flags = info.flags;
        if flags.contains(FieldFlags::OMIT) && !info.is_catch_all() {
            return Ok(0);
        }
        if !info.in_version(self.version) {
            return Ok(0);
        }
        if value.is_empty() && !flags.contains(FieldFlags::EMPTY) {
            return Ok(0);
        }
        if info.is_catch_all() {
            let View::Map(map) = value.view() else {
                return Ok(0);
            };
            let mut written = 0;
            for key in map.keys() {
                let Some(entry) = map.entry(&key) else {
                    continue;
                };
                let name = self.qname(&key)?;
                let target = self.target(&name, dest, wrap);
                let node = self.tree.acquire(name);
                self.tree.append_child(target, node);
                self.marshal_content(entry, node)?;
                written += 1;
            }
            return Ok(written);
        }
        let name = self.qname(&info.name)?;
        if info.is_attr() {
            let text = match value.view() {
                View::Scalar(t) => t.to_text(),
                View::Custom(c) => c.as_text().map(|t| t.to_text()).unwrap_or_default(),
                View::Nil => String::new(),
                _ => {
                    return Err(XmpError::BadValue(format!(
                        "{} cannot be written as an attribute",
                        info.name
                    )))
                }
            };
            let target = self.target(&name, dest, wrap);
            self.tree.set_attr(target, name, text);
            return Ok(0);
        }
        let target = self.target(&name, dest, wrap);
        let node = self.tree.acquire(name);
        self.tree.append_child(target, node);
        self.marshal_content(value, node)?;
        Ok(1)
    }

    /// Write the content of `value` into the existing element `node`
    pub fn marshal_content(&mut self, value: &dyn Field, node: NodeId) -> XmpResult<()> {
        match value.view() {
            View::Nil => {}
            View::Scalar(t) => self.tree[node].value = t.to_text(),
            View::Custom(c) => c.marshal_xmp(self, node)?,
            View::Record(r) => {
                if self.marshal_record(r, node, false)? > 0 {
                    self.mark_resource(node);
                }
            }
            View::List(list) => {
                let container = self
                    .tree
                    .acquire(QName::rdf(list.array_type().rdf_type()));
                self.tree.append_child(node, container);
                for i in 0..list.len() {
                    let Some(item) = list.item(i) else {
                        continue;
                    };
                    let li = self.tree.acquire(QName::rdf("li"));
                    self.tree.append_child(container, li);
                    self.marshal_content(item, li)?;
                }
            }
            View::AltText(alt) => alt.write_nodes(self.tree, node)?,
            View::Map(map) => {
                let mut written = 0;
                for key in map.keys() {
                    let Some(entry) = map.entry(&key) else {
                        continue;
                    };
                    if entry.is_empty() {
                        continue;
                    }
                    let name = self.qname(&key)?;
                    let child = self.tree.acquire(name);
                    self.tree.append_child(node, child);
                    self.marshal_content(entry, child)?;
                    written += 1;
                }
                if written > 0 {
                    self.mark_resource(node);
                }
            }
            View::Extensions(ext) => {
                let mut written = 0;
                for model in ext.iter() {
                    self.note_namespaces(model.namespaces());
                    written += self.marshal_record(model.as_record(), node, false)?;
                }
                if written > 0 {
                    self.mark_resource(node);
                }
            }
        }
        Ok(())
    }

    fn mark_resource(&mut self, node: NodeId) {
        self.tree
            .set_attr(node, QName::new(ns::RDF, "parseType"), "Resource");
    }
}

fn lookup<'r>(record: &'r dyn Record, info: &FieldInfo) -> XmpResult<&'r dyn Field> {
    field_at(record, &info.index).ok_or_else(|| {
        XmpError::InternalError(format!(
            "{} has no field at {:?}",
            record.type_name(),
            info.index
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::array::{AltString, Bag};
    use crate::xmp_record;
    use std::collections::BTreeMap;

    #[derive(Debug, Default)]
    struct Point {
        x: i64,
        y: i64,
    }

    xmp_record!(Point {
        x: "tst:x",
        y: "tst:y",
    });

    #[derive(Debug, Default)]
    struct Sample {
        id: String,
        title: AltString,
        tags: Bag<String>,
        origin: Point,
        legacy: String,
        extra: BTreeMap<String, String>,
        marker: String,
    }

    xmp_record!(Sample {
        id: "tst:ID,attr",
        title: "tst:Title",
        tags: "tst:Tags",
        origin: "tst:Origin",
        legacy: "tst:Legacy,max=1.0",
        extra: "tst:Extra,flat",
        marker: "tst:Marker,empty",
    });

    impl Model for Sample {
        fn namespaces(&self) -> Vec<Namespace> {
            vec![Namespace::new("tst", "http://test.example/")]
        }
    }

    fn encode(sample: &Sample, version: Version) -> (Tree, NodeId) {
        let ctx = Arc::new(Context::new());
        let mut tree = Tree::new(ctx.clone());
        let root = tree.acquire(QName::rdf("RDF"));
        let scope = NamespaceScope::new();
        Encoder::new(&ctx, &mut tree, root, &scope, version)
            .marshal_model(sample)
            .unwrap();
        (tree, root)
    }

    fn child(tree: &Tree, parent: NodeId, local: &str) -> Option<NodeId> {
        tree.find_child(parent, |n| n.name.local == local)
    }

    #[test]
    fn test_marshal_layout() {
        let mut sample = Sample {
            id: "abc".into(),
            title: AltString::from_default("Hello"),
            tags: vec!["a".to_string(), "b".to_string()].into(),
            origin: Point { x: 1, y: 2 },
            legacy: "old".into(),
            ..Default::default()
        };
        sample.extra.insert("tst:Free".into(), "yes".into());
        let (tree, root) = encode(&sample, Version::ZERO);

        let descriptions = tree.children(root);
        assert_eq!(descriptions.len(), 1);
        let desc = descriptions[0];
        assert_eq!(tree[desc].attr("http://test.example/", "ID"), Some("abc"));

        let tags = child(&tree, desc, "Tags").unwrap();
        let bag = tree.children(tags)[0];
        assert!(tree[bag].name.is_rdf("Bag"));
        assert_eq!(tree.children(bag).len(), 2);

        let origin = child(&tree, desc, "Origin").unwrap();
        assert_eq!(tree[origin].attr(ns::RDF, "parseType"), Some("Resource"));
        assert_eq!(tree.children(origin).len(), 2);

        assert!(child(&tree, desc, "Legacy").is_some());
        assert_eq!(tree[child(&tree, desc, "Free").unwrap()].value, "yes");
        // empty but flagged
        assert!(child(&tree, desc, "Marker").is_some());
    }

    #[test]
    fn test_marshal_respects_version_window() {
        let sample = Sample {
            legacy: "old".into(),
            ..Default::default()
        };
        let (tree, root) = encode(&sample, Version::new(2, 0, 0));
        let desc = tree.children(root)[0];
        assert!(child(&tree, desc, "Legacy").is_none());
    }

    #[test]
    fn test_unknown_prefix_fails() {
        let ctx = Arc::new(Context::new());
        let mut tree = Tree::new(ctx.clone());
        let root = tree.acquire(QName::rdf("RDF"));
        let scope = NamespaceScope::new();
        let enc = Encoder::new(&ctx, &mut tree, root, &scope, Version::ZERO);
        assert!(matches!(
            enc.qname("nope:Thing"),
            Err(XmpError::UnknownNamespace(_))
        ));
        assert_eq!(enc.qname("dc:title").unwrap(), QName::new(ns::DC, "title"));
    }
}
