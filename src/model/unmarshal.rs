//! Node-tree to model decoding
//!
//! The [`Decoder`] reads a parsed wire tree (`x:xmpmeta`/`rdf:RDF`/
//! `rdf:Description`) into the top-level nodes of a document. Every property
//! is routed to the model bound for its namespace, creating the model through
//! the namespace factory on first use. Content that no model field accepts is
//! copied verbatim onto the owning top-level node, so nothing read from the
//! wire is lost on the way back out.

use crate::core::context::Context;
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{ns, Namespace, NamespaceMap, NamespaceScope};
use crate::core::node::{NodeId, QName, Tree};
use crate::core::options::ParseOptions;
use crate::model::typeinfo::{FieldInfo, TagNamespace, TypeInfo};
use crate::model::{field_at_mut, Field, List, MapField, Record, ViewMut};
use crate::types::array::{AltString, ArrayType};
use crate::types::extension::Extensions;
use crate::utils::version::Version;
use std::sync::Arc;

/// Packet-level values found while decoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketInfo {
    /// `rdf:about` of the first description carrying one
    pub about: String,
    /// `x:xmptk` of the meta wrapper
    pub toolkit: String,
}

#[derive(Clone, Copy)]
enum Content<'w> {
    Attr(&'w str),
    Element(NodeId),
}

/// Nested content no field accepted, with the wire elements leading to it
struct Stray<'w> {
    trail: Vec<NodeId>,
    name: &'w QName,
    content: Content<'w>,
}

/// Reads a wire tree into models
pub struct Decoder<'a> {
    ctx: &'a Context,
    wire: &'a Tree,
    scope: &'a mut NamespaceScope,
    options: ParseOptions,
    declared: NamespaceMap,
    trail: Vec<NodeId>,
    strays: Vec<Stray<'a>>,
}

impl<'a> Decoder<'a> {
    pub fn new(
        ctx: &'a Context,
        wire: &'a Tree,
        scope: &'a mut NamespaceScope,
        options: ParseOptions,
    ) -> Self {
        Self {
            ctx,
            wire,
            scope,
            options,
            declared: NamespaceMap::new(),
            trail: Vec::new(),
            strays: Vec::new(),
        }
    }

    /// Record a `xmlns` declaration seen on the wire
    ///
    /// Declared prefixes name namespaces that are not registered.
    pub fn declare(&mut self, namespace: Namespace) {
        if let Err(e) = self.declared.insert(Arc::new(namespace)) {
            tracing::debug!("ignoring redeclared prefix: {}", e);
        }
    }

    /// Wire tree, for custom unmarshalers
    pub fn wire(&self) -> &'a Tree {
        self.wire
    }

    pub fn version(&self) -> Version {
        self.options.version
    }

    /// Decode a whole packet rooted at `root` into top-level nodes below `doc_root`
    pub fn decode_document(
        &mut self,
        doc: &mut Tree,
        doc_root: NodeId,
        root: NodeId,
    ) -> XmpResult<PacketInfo> {
        let wire = self.wire;
        let mut info = PacketInfo::default();
        let mut rdf = root;
        if wire[root].name.is(ns::X, "xmpmeta") {
            info.toolkit = wire[root].attr(ns::X, "xmptk").unwrap_or_default().to_string();
            let [child] = wire.children(root) else {
                return Err(XmpError::ParseError(format!(
                    "x:xmpmeta must contain exactly one element, found {}",
                    wire.children(root).len()
                )));
            };
            rdf = *child;
        }
        if !wire[rdf].name.is_rdf("RDF") {
            return Err(XmpError::ParseError(format!(
                "expected rdf:RDF, found {}",
                wire[rdf].name
            )));
        }
        for &desc in wire.children(rdf) {
            let node = &wire[desc];
            if !node.name.is_rdf("Description") {
                return Err(XmpError::ParseError(format!(
                    "expected rdf:Description, found {}",
                    node.name
                )));
            }
            if info.about.is_empty() {
                if let Some(about) = node.attr(ns::RDF, "about") {
                    info.about = about.to_string();
                }
            }
            for attr in &node.attrs {
                if is_syntax(&attr.name) {
                    continue;
                }
                self.decode_top(doc, doc_root, &attr.name, Content::Attr(&attr.value))?;
            }
            for &child in node.children() {
                self.decode_top(doc, doc_root, &wire[child].name, Content::Element(child))?;
            }
        }

        let tops = doc.children(doc_root).to_vec();
        for top in tops {
            if let Some(model) = doc[top].model.as_mut() {
                model.sync_from_xmp()?;
            }
        }
        Ok(info)
    }

    fn decode_top(
        &mut self,
        doc: &mut Tree,
        doc_root: NodeId,
        name: &QName,
        content: Content<'_>,
    ) -> XmpResult<()> {
        let key = self.qualified_name(name)?;
        let top = top_node(self.ctx, self.scope, doc, doc_root, &name.space, true)?;
        let Some(mut model) = doc[top].model.take() else {
            self.preserve(doc, top, name, content);
            return Ok(());
        };
        self.trail.clear();
        self.strays.clear();
        let decoded = self
            .ctx
            .types()
            .get(model.as_record(), TagNamespace::Xmp)
            .and_then(|info| self.decode_member(model.as_record_mut(), &info, &key, content));
        doc[top].model = Some(model);
        if !decoded? {
            self.preserve(doc, top, name, content);
        }
        for stray in std::mem::take(&mut self.strays) {
            self.keep_stray(doc, top, &stray);
        }
        Ok(())
    }

    fn preserve(&self, doc: &mut Tree, top: NodeId, name: &QName, content: Content<'_>) {
        match content {
            Content::Attr(value) => doc.set_attr(top, name.clone(), value),
            Content::Element(id) => {
                let copy = doc.copy_from(self.wire, id);
                doc.append_child(top, copy);
            }
        }
        tracing::debug!(name = %name, "preserving unmodeled content");
    }

    /// Remember nested content the record being decoded has no field for
    fn stray(&mut self, name: &'a QName, content: Content<'a>) {
        tracing::debug!(name = %name, "preserving unmodeled nested content");
        self.strays.push(Stray {
            trail: self.trail.clone(),
            name,
            content,
        });
    }

    /// Copy a stray below `top`, inside shells of the elements enclosing it
    ///
    /// Shells mirror the wire position: struct elements become resource
    /// nodes, array items keep their index. The encoder merges the shells
    /// into the elements it writes for the model.
    fn keep_stray(&self, doc: &mut Tree, top: NodeId, stray: &Stray<'_>) {
        let wire = self.wire;
        let mut parent = top;
        for (i, &node) in stray.trail.iter().enumerate() {
            let shell = self.shell(doc, parent, node);
            let next_is_item = stray
                .trail
                .get(i + 1)
                .and_then(|&next| wire.parent(next))
                .is_some_and(|p| is_array(&wire[p].name));
            if !next_is_item {
                doc.set_attr(shell, QName::rdf("parseType"), "Resource");
            }
            parent = shell;
        }
        if parent == top {
            self.preserve(doc, top, stray.name, stray.content);
            return;
        }
        match stray.content {
            Content::Attr(value) => doc.set_attr(parent, stray.name.clone(), value),
            Content::Element(id) => {
                let copy = doc.copy_from(wire, id);
                doc.append_child(parent, copy);
            }
        }
    }

    /// Shell of the wire element `node` below `parent`, created on first use
    fn shell(&self, doc: &mut Tree, parent: NodeId, node: NodeId) -> NodeId {
        let wire = self.wire;
        if let Some(array) = wire.parent(node).filter(|&p| is_array(&wire[p].name)) {
            let index = wire
                .children(array)
                .iter()
                .position(|&c| c == node)
                .unwrap_or(0);
            let kind = &wire[array].name;
            let container = match doc.find_child(parent, |n| &n.name == kind) {
                Some(id) => id,
                None => {
                    let id = doc.acquire(kind.clone());
                    doc.append_child(parent, id);
                    id
                }
            };
            while doc.children(container).len() <= index {
                let li = doc.acquire(QName::rdf("li"));
                doc.append_child(container, li);
            }
            return doc.children(container)[index];
        }
        let name = &wire[node].name;
        match doc.find_child(parent, |n| &n.name == name) {
            Some(id) => id,
            None => {
                let id = doc.acquire(name.clone());
                doc.append_child(parent, id);
                id
            }
        }
    }

    /// Bind `uri` in the document scope and return its prefix
    ///
    /// Registered namespaces become known; others are kept as external under
    /// their declared prefix, renamed when that prefix is taken.
    fn note_namespace(&mut self, uri: &str) -> XmpResult<String> {
        if let Some(bound) = self
            .scope
            .known()
            .get_by_uri(uri)
            .or_else(|| self.scope.external().get_by_uri(uri))
        {
            return Ok(bound.prefix().to_string());
        }
        if let Some(registered) = self.ctx.registry().get_by_uri(uri) {
            match self.scope.add_known(registered) {
                Ok(bound) => return Ok(bound.prefix().to_string()),
                Err(e) => tracing::warn!(uri, "cannot bind registered namespace: {}", e),
            }
        }
        if self.options.strict {
            return Err(XmpError::UnknownNamespace(uri.to_string()));
        }
        let mut prefix = self
            .declared
            .get_by_uri(uri)
            .map(|ns| ns.prefix().to_string())
            .unwrap_or_else(|| "ns".to_string());
        let mut n = 1;
        while self
            .scope
            .lookup(self.ctx.registry(), &prefix)
            .is_some_and(|taken| taken.uri() != uri)
        {
            prefix = format!("ns{}", n);
            n += 1;
        }
        tracing::debug!(uri, prefix = %prefix, "binding external namespace");
        let bound = self
            .scope
            .add_external(Arc::new(Namespace::new(prefix, uri)))?;
        Ok(bound.prefix().to_string())
    }

    /// `prefix:local` form of a wire name, binding its namespace
    pub fn qualified_name(&mut self, name: &QName) -> XmpResult<String> {
        let prefix = self.note_namespace(&name.space)?;
        Ok(format!("{}:{}", prefix, name.local))
    }

    /// Text of a simple property element
    ///
    /// Honors `rdf:resource` and an `rdf:value` child before the element text.
    pub fn text(&self, node: NodeId) -> String {
        let data = &self.wire[node];
        if let Some(resource) = data.attr(ns::RDF, "resource") {
            return resource.to_string();
        }
        if let Some(value) = self.wire.find_child(node, |c| c.name.is_rdf("value")) {
            return self.wire[value].value.clone();
        }
        data.value.clone()
    }

    /// Element holding the fields of a struct-valued property
    fn resource_node(&self, node: NodeId) -> NodeId {
        let data = &self.wire[node];
        if data.attr(ns::RDF, "parseType") == Some("Resource") {
            return node;
        }
        match data.children() {
            [only] if self.wire[*only].name.is_rdf("Description") => *only,
            _ => node,
        }
    }

    /// Decode the element `node` into `field`
    pub fn decode_value(&mut self, field: &mut dyn Field, node: NodeId) -> XmpResult<()> {
        self.trail.push(node);
        let result = self.decode_view(field, node);
        self.trail.pop();
        result
    }

    fn decode_view(&mut self, field: &mut dyn Field, node: NodeId) -> XmpResult<()> {
        match field.view_mut() {
            ViewMut::Custom(custom) => custom.unmarshal_xmp(self, node),
            ViewMut::Scalar(text) => text.set_text(&self.text(node)),
            ViewMut::Record(record) => self.decode_record(record, node),
            ViewMut::List(list) => self.decode_list(list, node),
            ViewMut::AltText(alt) => {
                *alt = AltString::read_nodes(self.wire, node)?;
                Ok(())
            }
            ViewMut::Map(map) => self.decode_map(map, node),
            ViewMut::Extensions(ext) => self.decode_extensions(ext, node),
        }
    }

    fn decode_record(&mut self, record: &mut dyn Record, node: NodeId) -> XmpResult<()> {
        let node = self.resource_node(node);
        let info = self.ctx.types().get(record, TagNamespace::Xmp)?;
        let wire = self.wire;
        for attr in &wire[node].attrs {
            if is_syntax(&attr.name) {
                continue;
            }
            let key = self.qualified_name(&attr.name)?;
            if !self.decode_member(record, &info, &key, Content::Attr(&attr.value))? {
                self.stray(&attr.name, Content::Attr(&attr.value));
            }
        }
        for &child in wire.children(node) {
            let name = &wire[child].name;
            if is_syntax(name) {
                continue;
            }
            let key = self.qualified_name(name)?;
            if !self.decode_member(record, &info, &key, Content::Element(child))? {
                self.stray(name, Content::Element(child));
            }
        }
        Ok(())
    }

    /// Route one attribute or element to the field named `key`
    ///
    /// Falls back to the catch-all map of the record. Returns `false` when
    /// neither accepts the content.
    fn decode_member(
        &mut self,
        record: &mut dyn Record,
        info: &TypeInfo,
        key: &str,
        content: Content<'_>,
    ) -> XmpResult<bool> {
        let field: &mut dyn Field = if let Some(field_info) = info.find(key, self.options.version) {
            field_at_mut(record, &field_info.index).ok_or_else(|| missing(info, field_info))?
        } else if let Some(field_info) = info.catch_all() {
            let catch_all =
                field_at_mut(record, &field_info.index).ok_or_else(|| missing(info, field_info))?;
            match catch_all.view_mut() {
                ViewMut::Map(map) => map.entry_or_default(key),
                _ => return Ok(false),
            }
        } else {
            return Ok(false);
        };
        match content {
            Content::Attr(text) => set_field_text(field, text)?,
            Content::Element(node) => self.decode_value(field, node)?,
        }
        Ok(true)
    }

    fn decode_list(&mut self, list: &mut dyn List, node: NodeId) -> XmpResult<()> {
        let wire = self.wire;
        list.clear();
        let children = wire.children(node);
        if children.is_empty() {
            // single value written without a container
            let text = wire[node].value.trim();
            if !text.is_empty() {
                if let Some(item) = slot(list, 0) {
                    set_field_text(item, text)?;
                }
            }
            return Ok(());
        }
        let [container] = children else {
            return Err(XmpError::MalformedArray(format!(
                "expected one container below {}, found {}",
                wire[node].name,
                children.len()
            )));
        };
        let container_name = &wire[*container].name;
        if container_name.space != ns::RDF || ArrayType::from_rdf_type(&container_name.local).is_none() {
            return Err(XmpError::MalformedArray(format!(
                "unexpected container {}",
                container_name
            )));
        }
        let capacity = list.len();
        for (i, &li) in wire.children(*container).iter().enumerate() {
            if !wire[li].name.is_rdf("li") {
                return Err(XmpError::MalformedArray(format!(
                    "unexpected array item {}",
                    wire[li].name
                )));
            }
            let Some(item) = slot(list, i) else {
                return Err(XmpError::MalformedArray(format!(
                    "{} holds at most {} items",
                    wire[node].name, capacity
                )));
            };
            self.decode_value(item, li)?;
        }
        Ok(())
    }

    fn decode_map(&mut self, map: &mut dyn MapField, node: NodeId) -> XmpResult<()> {
        let node = self.resource_node(node);
        let wire = self.wire;
        for attr in &wire[node].attrs {
            if is_syntax(&attr.name) {
                continue;
            }
            let key = self.qualified_name(&attr.name)?;
            set_field_text(map.entry_or_default(&key), &attr.value)?;
        }
        for &child in wire.children(node) {
            if is_syntax(&wire[child].name) {
                continue;
            }
            let key = self.qualified_name(&wire[child].name)?;
            let entry = map.entry_or_default(&key);
            self.decode_value(entry, child)?;
        }
        Ok(())
    }

    fn decode_extensions(&mut self, ext: &mut Extensions, node: NodeId) -> XmpResult<()> {
        let node = self.resource_node(node);
        let wire = self.wire;
        let mut members: Vec<(&'a QName, Content<'a>)> = wire[node]
            .attrs
            .iter()
            .filter(|a| !is_syntax(&a.name))
            .map(|a| (&a.name, Content::Attr(a.value.as_str())))
            .collect();
        members.extend(
            wire.children(node)
                .iter()
                .filter(|&&c| !is_syntax(&wire[c].name))
                .map(|&c| (&wire[c].name, Content::Element(c))),
        );

        for (name, content) in members {
            let key = self.qualified_name(name)?;
            if ext.get(&name.space).is_none() {
                let Some(model) = self
                    .scope
                    .lookup(self.ctx.registry(), &name.space)
                    .and_then(|ns| ns.new_model())
                else {
                    self.stray(name, content);
                    continue;
                };
                for namespace in model.namespaces() {
                    if let Err(e) = self.scope.add_known(Arc::new(namespace)) {
                        tracing::warn!("conflicting extension namespace: {}", e);
                    }
                }
                ext.insert(model);
            }
            let Some(model) = ext.get_mut(&name.space) else {
                self.stray(name, content);
                continue;
            };
            let info = self.ctx.types().get(model.as_record(), TagNamespace::Xmp)?;
            if !self.decode_member(model.as_record_mut(), &info, &key, content)? {
                self.stray(name, content);
            }
        }
        Ok(())
    }
}

/// Top-level node for namespace `uri` below `root`, created on first use
///
/// A node whose model handles `uri` wins over a raw node of that namespace.
/// With `with_model`, a node without a model gets one from the namespace
/// factory and the model's namespaces become known.
pub(crate) fn top_node(
    ctx: &Context,
    scope: &mut NamespaceScope,
    tree: &mut Tree,
    root: NodeId,
    uri: &str,
    with_model: bool,
) -> XmpResult<NodeId> {
    if let Some(id) = tree.find_child_by_model(root, uri) {
        return Ok(id);
    }
    let namespace = scope
        .lookup(ctx.registry(), uri)
        .ok_or_else(|| XmpError::UnknownNamespace(uri.to_string()))?;
    let node = match tree.find_child_by_ns(root, namespace.uri()) {
        Some(id) => id,
        None => {
            let id = tree.acquire(QName::new(namespace.uri(), namespace.prefix()));
            tree.append_child(root, id);
            id
        }
    };
    if with_model && tree[node].model.is_none() {
        if let Some(model) = namespace.new_model() {
            for model_ns in model.namespaces() {
                if let Err(e) = scope.add_known(Arc::new(model_ns)) {
                    tracing::warn!("conflicting model namespace: {}", e);
                }
            }
            tracing::trace!(namespace = namespace.prefix(), "created model");
            tree[node].model = Some(model);
        }
    }
    Ok(node)
}

/// Assign the text form of a value to a field
pub(crate) fn set_field_text(field: &mut dyn Field, text: &str) -> XmpResult<()> {
    match field.view_mut() {
        ViewMut::Scalar(value) => value.set_text(text),
        ViewMut::Custom(custom) => match custom.as_text_mut() {
            Some(value) => value.set_text(text),
            None => Err(XmpError::BadValue(format!(
                "value '{}' cannot be assigned to a structured field",
                text
            ))),
        },
        ViewMut::AltText(alt) => {
            *alt = AltString::from_default(text);
            Ok(())
        }
        ViewMut::List(list) => {
            list.clear();
            if !text.is_empty() {
                if let Some(item) = slot(list, 0) {
                    set_field_text(item, text)?;
                }
            }
            Ok(())
        }
        ViewMut::Record(_) | ViewMut::Map(_) | ViewMut::Extensions(_) => {
            Err(XmpError::BadValue(format!(
                "value '{}' cannot be assigned to a structured field",
                text
            )))
        }
    }
}

/// Next writable item while filling a cleared list
fn slot(list: &mut dyn List, index: usize) -> Option<&mut dyn Field> {
    if list.resizable() {
        list.push_default()
    } else {
        list.item_mut(index)
    }
}

fn is_array(name: &QName) -> bool {
    name.space == ns::RDF && ArrayType::from_rdf_type(&name.local).is_some()
}

/// RDF syntax attributes and `xml:` attributes carry no property
fn is_syntax(name: &QName) -> bool {
    name.space == ns::RDF || name.space == ns::XML
}

fn missing(info: &TypeInfo, field: &FieldInfo) -> XmpError {
    XmpError::InternalError(format!(
        "{} has no field at {:?}",
        info.type_name, field.index
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::marshal::Encoder;
    use crate::model::Model;
    use crate::types::array::{AltItem, Bag};
    use crate::xmp_record;
    use std::collections::BTreeMap;

    const TST: &str = "http://test.example/";

    #[derive(Debug, Default, PartialEq)]
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
        path: Vec<Point>,
        origin: Point,
        extra: BTreeMap<String, String>,
    }

    xmp_record!(Sample {
        id: "tst:ID,attr",
        title: "tst:Title",
        tags: "tst:Tags",
        path: "tst:Path",
        origin: "tst:Origin",
        extra: "tst:Extra,flat",
    });

    impl Model for Sample {
        fn namespaces(&self) -> Vec<Namespace> {
            vec![Namespace::new("tst", TST)]
        }
    }

    fn new_sample() -> Box<dyn Model> {
        Box::new(Sample::default())
    }

    fn context() -> Arc<Context> {
        let ctx = Arc::new(Context::new());
        ctx.register(Namespace::new("tst", TST).with_factory(new_sample), &[])
            .unwrap();
        ctx
    }

    fn encode(ctx: &Arc<Context>, sample: &Sample) -> (Tree, NodeId) {
        let mut wire = Tree::new(ctx.clone());
        let root = wire.acquire(QName::rdf("RDF"));
        let scope = NamespaceScope::new();
        Encoder::new(ctx, &mut wire, root, &scope, Version::ZERO)
            .marshal_model(sample)
            .unwrap();
        (wire, root)
    }

    fn decode(ctx: &Arc<Context>, wire: &Tree, root: NodeId) -> XmpResult<(Tree, NodeId, NamespaceScope)> {
        let mut doc = Tree::new(ctx.clone());
        let doc_root = doc.acquire(QName::rdf("RDF"));
        let mut scope = NamespaceScope::new();
        Decoder::new(ctx, wire, &mut scope, ParseOptions::default())
            .decode_document(&mut doc, doc_root, root)?;
        Ok((doc, doc_root, scope))
    }

    #[test]
    fn test_decode_round_trip() {
        let ctx = context();
        let mut title = AltString::new();
        title.push(AltItem {
            value: "Hello".into(),
            lang: "en".into(),
            is_default: true,
        });
        title.set("de", "Hallo");
        let mut sample = Sample {
            id: "abc".into(),
            title,
            tags: vec!["a".to_string(), "b".to_string()].into(),
            path: vec![Point { x: 1, y: 2 }, Point { x: 3, y: 4 }],
            origin: Point { x: 5, y: 6 },
            ..Default::default()
        };
        sample.extra.insert("tst:Free".into(), "yes".into());
        let (wire, root) = encode(&ctx, &sample);

        let (doc, doc_root, scope) = decode(&ctx, &wire, root).unwrap();
        let top = doc.children(doc_root)[0];
        let decoded = doc[top]
            .model
            .as_deref()
            .and_then(|m| m.downcast_ref::<Sample>())
            .unwrap();
        assert_eq!(decoded.id, "abc");
        assert_eq!(decoded.title, sample.title);
        assert_eq!(decoded.tags, sample.tags);
        assert_eq!(decoded.path, sample.path);
        assert_eq!(decoded.origin, Point { x: 5, y: 6 });
        assert_eq!(decoded.extra.get("tst:Free").map(String::as_str), Some("yes"));
        assert!(scope.known().contains("tst"));
    }

    #[test]
    fn test_unmodeled_content_is_preserved() {
        let ctx = context();
        let mut wire = Tree::new(ctx.clone());
        let root = wire.acquire(QName::rdf("RDF"));
        let desc = wire.acquire(QName::rdf("Description"));
        wire.append_child(root, desc);
        wire.set_attr(desc, QName::new("http://vendor.example/", "Flag"), "on");
        let raw = wire.acquire_text(QName::new("http://vendor.example/", "Note"), "kept");
        wire.append_child(desc, raw);

        let mut doc = Tree::new(ctx.clone());
        let doc_root = doc.acquire(QName::rdf("RDF"));
        let mut scope = NamespaceScope::new();
        let mut decoder = Decoder::new(&ctx, &wire, &mut scope, ParseOptions::default());
        decoder.declare(Namespace::new("vnd", "http://vendor.example/"));
        decoder.decode_document(&mut doc, doc_root, root).unwrap();

        let top = doc.children(doc_root)[0];
        assert!(doc[top].model.is_none());
        assert_eq!(doc[top].attr("http://vendor.example/", "Flag"), Some("on"));
        let note = doc.children(top)[0];
        assert_eq!(doc[note].value, "kept");
        assert_eq!(
            scope.external().get_by_uri("http://vendor.example/").map(|ns| ns.prefix()),
            Some("vnd")
        );
    }

    #[test]
    fn test_nested_unknown_content_is_kept() {
        let ctx = context();
        let sample = Sample {
            path: vec![Point { x: 1, y: 2 }, Point { x: 3, y: 4 }],
            origin: Point { x: 5, y: 6 },
            ..Default::default()
        };
        let (mut wire, root) = encode(&ctx, &sample);
        let desc = wire.children(root)[0];
        let origin = wire.find_child(desc, |n| n.name.local == "Origin").unwrap();
        let z = wire.acquire_text(QName::new(TST, "z"), "7");
        wire.append_child(origin, z);
        let path = wire.find_child(desc, |n| n.name.local == "Path").unwrap();
        let seq = wire.children(path)[0];
        let second = wire.children(seq)[1];
        wire.set_attr(second, QName::new(TST, "w"), "8");

        let (doc, doc_root, _) = decode(&ctx, &wire, root).unwrap();
        let top = doc.children(doc_root)[0];
        let decoded = doc[top]
            .model
            .as_deref()
            .and_then(|m| m.downcast_ref::<Sample>())
            .unwrap();
        assert_eq!(decoded.origin, Point { x: 5, y: 6 });
        assert_eq!(decoded.path.len(), 2);

        let shell = doc.find_child(top, |n| n.name.local == "Origin").unwrap();
        assert_eq!(doc[shell].attr(ns::RDF, "parseType"), Some("Resource"));
        assert_eq!(doc[doc.children(shell)[0]].value, "7");

        let path_shell = doc.find_child(top, |n| n.name.local == "Path").unwrap();
        let items = doc.children(doc.children(path_shell)[0]).to_vec();
        assert_eq!(items.len(), 2);
        assert_eq!(doc[items[0]].attr(TST, "w"), None);
        assert_eq!(doc[items[1]].attr(TST, "w"), Some("8"));
    }

    #[test]
    fn test_strict_rejects_unknown_namespace() {
        let ctx = context();
        let mut wire = Tree::new(ctx.clone());
        let root = wire.acquire(QName::rdf("RDF"));
        let desc = wire.acquire(QName::rdf("Description"));
        wire.append_child(root, desc);
        let raw = wire.acquire_text(QName::new("http://vendor.example/", "Note"), "x");
        wire.append_child(desc, raw);

        let mut doc = Tree::new(ctx.clone());
        let doc_root = doc.acquire(QName::rdf("RDF"));
        let mut scope = NamespaceScope::new();
        let result = Decoder::new(&ctx, &wire, &mut scope, ParseOptions::new().strict())
            .decode_document(&mut doc, doc_root, root);
        assert!(matches!(result, Err(XmpError::UnknownNamespace(_))));
    }

    #[test]
    fn test_malformed_array() {
        let ctx = context();
        let sample = Sample {
            tags: vec!["a".to_string()].into(),
            ..Default::default()
        };
        let (mut wire, root) = encode(&ctx, &sample);
        let desc = wire.children(root)[0];
        let tags = wire.find_child(desc, |n| n.name.local == "Tags").unwrap();
        let extra = wire.acquire(QName::rdf("Seq"));
        wire.append_child(tags, extra);

        assert!(matches!(
            decode(&ctx, &wire, root),
            Err(XmpError::MalformedArray(_))
        ));
    }

    #[test]
    fn test_packet_wrapper_and_about() {
        let ctx = context();
        let mut wire = Tree::new(ctx.clone());
        let meta = wire.acquire(QName::new(ns::X, "xmpmeta"));
        wire.set_attr(meta, QName::new(ns::X, "xmptk"), "test-kit");
        let rdf = wire.acquire(QName::rdf("RDF"));
        wire.append_child(meta, rdf);
        let desc = wire.acquire(QName::rdf("Description"));
        wire.set_attr(desc, QName::rdf("about"), "uuid:1");
        wire.append_child(rdf, desc);

        let mut doc = Tree::new(ctx.clone());
        let doc_root = doc.acquire(QName::rdf("RDF"));
        let mut scope = NamespaceScope::new();
        let info = Decoder::new(&ctx, &wire, &mut scope, ParseOptions::default())
            .decode_document(&mut doc, doc_root, meta)
            .unwrap();
        assert_eq!(info.about, "uuid:1");
        assert_eq!(info.toolkit, "test-kit");

        let bad = wire.acquire(QName::rdf("Bag"));
        wire.append_child(rdf, bad);
        let mut scope = NamespaceScope::new();
        let result = Decoder::new(&ctx, &wire, &mut scope, ParseOptions::default())
            .decode_document(&mut doc, doc_root, meta);
        assert!(matches!(result, Err(XmpError::ParseError(_))));
    }
}
