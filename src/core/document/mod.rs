//! XMP documents
//!
//! A [`Document`] binds typed models to namespaces and keeps everything read
//! from the wire that no model describes as raw nodes. Paths resolve against
//! the model first and fall back to the raw nodes of the same namespace.
//!
//! # Example
//!
//! ```
//! use xmpdoc::{Document, SyncFlags};
//!
//! let mut doc = Document::new();
//! doc.set("dc:format", "image/png", SyncFlags::DEFAULT).unwrap();
//! doc.set("dc:title[x-default]", "Sunset", SyncFlags::DEFAULT).unwrap();
//! assert_eq!(doc.get("dc:title").unwrap(), "Sunset");
//!
//! let xml = doc.serialize().unwrap();
//! let parsed: Document = xml.parse().unwrap();
//! assert_eq!(parsed.get("dc:format").unwrap(), "image/png");
//! ```

mod rawpath;
mod sync;

use crate::core::context::Context;
use crate::core::error::{XmpError, XmpResult};
use crate::core::flags::SyncFlags;
use crate::core::namespace::{ns, Namespace, NamespaceScope};
use crate::core::node::{NodeId, QName, Tree};
use crate::core::options::{ParseOptions, SerializeOptions};
use crate::core::parser::XmpParser;
use crate::core::serializer::XmpSerializer;
use crate::core::xpath::Path;
use crate::model::marshal::Encoder;
use crate::model::path::{self as model_path, Outcome};
use crate::model::unmarshal::Decoder;
use crate::model::Model;
use crate::types::value::{PathValue, PathValueList};
use rawpath::RawNames;
use std::collections::HashSet;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

pub use sync::Converter;

/// Toolkit name written to `x:xmptk` when a document carries none
pub const DEFAULT_TOOLKIT: &str = concat!("xmpdoc ", env!("CARGO_PKG_VERSION"));

/// An XMP document
#[derive(Debug)]
pub struct Document {
    ctx: Arc<Context>,
    tree: Tree,
    /// Parent of the top-level nodes, one per namespace
    root: NodeId,
    scope: NamespaceScope,
    about: String,
    toolkit: String,
    dirty: bool,
}

impl Document {
    /// Create an empty document on the global context
    pub fn new() -> Self {
        Self::with_context(Context::global())
    }

    /// Create an empty document on a private context
    pub fn with_context(ctx: Arc<Context>) -> Self {
        let mut tree = Tree::new(ctx.clone());
        let root = tree.acquire(QName::new(ns::X, "xmpmeta"));
        Self {
            ctx,
            tree,
            root,
            scope: NamespaceScope::new(),
            about: String::new(),
            toolkit: String::new(),
            dirty: false,
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// `rdf:about` of the described resource
    pub fn about(&self) -> &str {
        &self.about
    }

    pub fn set_about(&mut self, about: impl Into<String>) {
        self.about = about.into();
        self.dirty = true;
    }

    /// Toolkit that wrote the packet, empty for new documents
    pub fn toolkit(&self) -> &str {
        &self.toolkit
    }

    pub fn set_toolkit(&mut self, toolkit: impl Into<String>) {
        self.toolkit = toolkit.into();
    }

    /// Whether the document changed since it was parsed or created
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    // ------------------------------------------------------------------
    // Models and namespaces
    // ------------------------------------------------------------------

    /// Bind a model to its primary namespace, replacing any model bound there
    pub fn add_model(&mut self, model: Box<dyn Model>) -> XmpResult<()> {
        self.bind(model)?;
        self.dirty = true;
        Ok(())
    }

    /// Typed form of [`Document::add_model`]
    pub fn add<M: Model>(&mut self, model: M) -> XmpResult<()> {
        self.add_model(Box::new(model))
    }

    /// Model handling the namespace `name`, given as prefix or URI
    pub fn find_model(&self, name: &str) -> Option<&dyn Model> {
        let namespace = self.scope.lookup(self.ctx.registry(), name)?;
        let top = self.tree.find_child_by_model(self.root, namespace.uri())?;
        self.tree[top].model.as_deref()
    }

    pub fn find_model_mut(&mut self, name: &str) -> Option<&mut (dyn Model + 'static)> {
        let namespace = self.scope.lookup(self.ctx.registry(), name)?;
        let top = self.tree.find_child_by_model(self.root, namespace.uri())?;
        self.dirty = true;
        self.tree[top].model.as_deref_mut()
    }

    /// First bound model of type `T`
    pub fn find<T: Model>(&self) -> Option<&T> {
        self.tree
            .children(self.root)
            .iter()
            .filter_map(|&top| self.tree[top].model.as_deref())
            .find_map(|model| model.downcast_ref::<T>())
    }

    pub fn find_mut<T: Model>(&mut self) -> Option<&mut T> {
        let top = self.tree.children(self.root).iter().copied().find(|&top| {
            self.tree[top]
                .model
                .as_deref()
                .is_some_and(|model| model.downcast_ref::<T>().is_some())
        })?;
        self.dirty = true;
        self.tree[top].model.as_deref_mut()?.downcast_mut::<T>()
    }

    /// Model for namespace `name`, created from its factory when absent
    pub fn make_model(&mut self, name: &str) -> XmpResult<&mut (dyn Model + 'static)> {
        let namespace = self.namespace(name)?;
        let top = match self.tree.find_child_by_model(self.root, namespace.uri()) {
            Some(top) => top,
            None => {
                let model = self.new_model(&namespace).ok_or_else(|| {
                    XmpError::NotSupported(format!(
                        "namespace {} has no model",
                        namespace.prefix()
                    ))
                })?;
                self.dirty = true;
                self.bind(model)?
            }
        };
        self.tree[top]
            .model
            .as_deref_mut()
            .ok_or_else(|| XmpError::InternalError(format!("model for {} vanished", name)))
    }

    /// Bound models in document order
    pub fn models(&self) -> Vec<&dyn Model> {
        self.tree
            .children(self.root)
            .iter()
            .filter_map(|&top| self.tree[top].model.as_deref())
            .collect()
    }

    /// Namespaces in use: model namespaces first, then namespaces of raw content
    pub fn namespaces(&self) -> Vec<Arc<Namespace>> {
        self.scope.all()
    }

    /// Declare a namespace for content no model describes
    ///
    /// Fails when the prefix is already bound to another URI.
    pub fn add_namespace(&mut self, namespace: Namespace) -> XmpResult<Arc<Namespace>> {
        self.scope.add_external(Arc::new(namespace))
    }

    /// Drop a namespace with its model and raw content
    pub fn remove_namespace(&mut self, name: &str) -> XmpResult<()> {
        let namespace = self.namespace(name)?;
        let top = self
            .tree
            .find_child_by_model(self.root, namespace.uri())
            .or_else(|| self.tree.find_child_by_ns(self.root, namespace.uri()));
        if let Some(top) = top {
            self.release_top(top);
        }
        self.scope.remove(namespace.uri());
        Ok(())
    }

    /// Keep only namespaces named in `keep`, directly or as a registry group
    pub fn filter_namespaces(&mut self, keep: &[&str]) {
        let registry = self.ctx.registry();
        let mut uris = HashSet::new();
        for name in keep {
            let group = registry.group(name);
            if group.is_empty() {
                if let Some(namespace) = self.scope.lookup(registry, name) {
                    uris.insert(namespace.uri().to_string());
                }
            } else {
                uris.extend(group.iter().map(|namespace| namespace.uri().to_string()));
            }
        }
        let drop: Vec<NodeId> = self
            .tree
            .children(self.root)
            .iter()
            .copied()
            .filter(|&top| {
                let node = &self.tree[top];
                let by_model = node.model.as_ref().is_some_and(|model| {
                    model.namespaces().iter().any(|ns| uris.contains(ns.uri()))
                });
                !by_model && !uris.contains(&node.name.space)
            })
            .collect();
        for top in drop {
            self.release_top(top);
        }
    }

    fn release_top(&mut self, top: NodeId) {
        let node = &self.tree[top];
        let mut uris = vec![node.name.space.clone()];
        if let Some(model) = &node.model {
            uris.extend(model.namespaces().iter().map(|ns| ns.uri().to_string()));
        }
        tracing::debug!(namespace = %node.name.space, "removing namespace");
        self.tree.release(top);
        for uri in uris {
            self.scope.remove(&uri);
        }
        self.dirty = true;
    }

    fn namespace(&self, name: &str) -> XmpResult<Arc<Namespace>> {
        self.scope
            .lookup(self.ctx.registry(), name)
            .ok_or_else(|| XmpError::UnknownNamespace(name.to_string()))
    }

    fn path_namespace(&self, path: &Path) -> XmpResult<Arc<Namespace>> {
        let prefix = path.prefix().ok_or_else(|| {
            XmpError::InvalidPathSegment(format!("path {} has no namespace prefix", path))
        })?;
        self.namespace(prefix)
    }

    fn new_model(&self, namespace: &Namespace) -> Option<Box<dyn Model>> {
        namespace.new_model().or_else(|| {
            self.ctx
                .registry()
                .get_by_uri(namespace.uri())
                .and_then(|registered| registered.new_model())
        })
    }

    fn bind(&mut self, model: Box<dyn Model>) -> XmpResult<NodeId> {
        let primary = model.primary_namespace().ok_or_else(|| {
            XmpError::BadParam(format!("model {} declares no namespace", model.type_name()))
        })?;
        for namespace in model.namespaces() {
            if let Err(e) = self.scope.add_known(Arc::new(namespace)) {
                tracing::warn!("conflicting model namespace: {}", e);
            }
        }
        let top = match self.tree.find_child_by_ns(self.root, primary.uri()) {
            Some(top) => top,
            None => {
                let top = self.tree.acquire(QName::new(primary.uri(), primary.prefix()));
                self.tree.append_child(self.root, top);
                top
            }
        };
        if self.tree[top].model.replace(model).is_some() {
            tracing::debug!(namespace = primary.prefix(), "replaced bound model");
        }
        Ok(top)
    }

    // ------------------------------------------------------------------
    // Parsing and serialization
    // ------------------------------------------------------------------

    /// Parse a packet on the global context
    pub fn parse(xml: &str) -> XmpResult<Self> {
        Self::parse_with(Context::global(), xml, ParseOptions::default())
    }

    pub fn parse_with(ctx: Arc<Context>, xml: &str, options: ParseOptions) -> XmpResult<Self> {
        let mut doc = Self::with_context(ctx);
        doc.decode(xml, options)?;
        doc.dirty = false;
        Ok(doc)
    }

    /// Parse a UTF-8 packet, with or without byte order mark
    pub fn from_bytes(bytes: &[u8]) -> XmpResult<Self> {
        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| XmpError::ParseError(format!("packet is not UTF-8: {}", e)))?;
        Self::parse(xml)
    }

    /// Read a packet into this document
    ///
    /// Properties land in the models already bound, other namespaces get
    /// models from their factories or are kept raw.
    pub fn decode(&mut self, xml: &str, options: ParseOptions) -> XmpResult<()> {
        let packet = XmpParser::new(self.ctx.clone()).parse_packet(xml)?;
        let mut decoder = Decoder::new(&self.ctx, &packet.tree, &mut self.scope, options);
        for namespace in packet.declarations.iter().cloned() {
            decoder.declare(namespace);
        }
        let info = decoder.decode_document(&mut self.tree, self.root, packet.root)?;
        if !info.about.is_empty() {
            self.about = info.about;
        }
        if !info.toolkit.is_empty() {
            self.toolkit = info.toolkit;
        }
        self.dirty = true;
        Ok(())
    }

    /// Serialize with default options
    pub fn serialize(&mut self) -> XmpResult<String> {
        self.serialize_with(SerializeOptions::default())
    }

    pub fn serialize_with(&mut self, options: SerializeOptions) -> XmpResult<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer, options)?;
        String::from_utf8(buffer)
            .map_err(|e| XmpError::SerializationError(format!("UTF-8 encoding error: {}", e)))
    }

    /// Write the packet to `out`, returning the number of bytes written
    ///
    /// Models get their `sync_to_xmp` hook called first.
    pub fn write_to<W: Write>(&mut self, out: W, options: SerializeOptions) -> XmpResult<usize> {
        for top in self.tree.children(self.root).to_vec() {
            if let Some(model) = self.tree[top].model.as_mut() {
                model.sync_to_xmp()?;
            }
        }

        let mut wire = Tree::new(self.ctx.clone());
        let rdf = wire.acquire(QName::rdf("RDF"));
        let local = {
            let mut encoder = Encoder::new(&self.ctx, &mut wire, rdf, &self.scope, options.version);
            for &top in self.tree.children(self.root) {
                if let Some(model) = self.tree[top].model.as_deref() {
                    encoder.marshal_model(model)?;
                }
                encoder.copy_raw(&self.tree, top);
            }
            encoder.model_namespaces().clone()
        };

        let toolkit = if self.toolkit.is_empty() {
            DEFAULT_TOOLKIT
        } else {
            self.toolkit.as_str()
        };
        XmpSerializer::new(&self.ctx, &self.scope, options)
            .with_namespaces(&local)
            .write_packet(out, &wire, rdf, &self.about, toolkit)
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    /// Value at `path`
    ///
    /// Values a model declares but does not hold read as an empty string.
    /// Paths neither a model nor raw content knows fail with
    /// [`XmpError::NotFound`].
    pub fn get_path(&self, path: &Path) -> XmpResult<String> {
        let namespace = self.path_namespace(path)?;
        if let Some(top) = self.tree.find_child_by_model(self.root, namespace.uri()) {
            if let Some(model) = self.tree[top].model.as_deref() {
                if let Some(value) = model_path::lookup(&self.ctx, model.as_record(), path)? {
                    return Ok(value);
                }
            }
        }
        if let Some(top) = self.tree.find_child_by_ns(self.root, namespace.uri()) {
            let names = RawNames {
                ctx: &self.ctx,
                scope: &self.scope,
            };
            if let Some(value) = rawpath::get(&names, &self.tree, top, path) {
                return Ok(value);
            }
        }
        Err(XmpError::path_not_found(path))
    }

    /// [`Document::get_path`] for a path in string form
    pub fn get(&self, path: &str) -> XmpResult<String> {
        self.get_path(&Path::parse(path)?)
    }

    /// Write `value` at `path` under `flags`
    ///
    /// Flags without any transition bit behave like [`SyncFlags::DEFAULT`].
    /// A missing model is created when the namespace has a factory and the
    /// flags allow creation. With [`SyncFlags::NOFAIL`] every error except
    /// malformed input becomes a no-op.
    pub fn set_path(&mut self, path: &Path, value: &str, flags: SyncFlags) -> XmpResult<()> {
        let nofail = flags.contains(SyncFlags::NOFAIL);
        match self.apply_path(path, value, effective(flags)) {
            Err(e) if nofail && !e.is_parse_error() => {
                tracing::debug!(path = %path, error = %e, "ignoring failed set");
                Ok(())
            }
            result => result,
        }
    }

    /// [`Document::set_path`] for a path in string form
    pub fn set(&mut self, path: &str, value: &str, flags: SyncFlags) -> XmpResult<()> {
        self.set_path(&Path::parse(path)?, value, flags)
    }

    /// Write a path/value pair under its own flags
    pub fn set_path_value(&mut self, value: &PathValue) -> XmpResult<()> {
        self.set_path(&value.path, &value.value, value.flags)
    }

    fn apply_path(&mut self, path: &Path, value: &str, flags: SyncFlags) -> XmpResult<()> {
        let namespace = self.path_namespace(path)?;
        let outcome = match self.tree.find_child_by_model(self.root, namespace.uri()) {
            Some(top) => match self.tree[top].model.as_deref_mut() {
                Some(model) => model_path::apply(&self.ctx, model.as_record_mut(), path, value, flags)?,
                None => Outcome::NotFound,
            },
            None => self.apply_new_model(&namespace, path, value, flags)?,
        };
        let outcome = match outcome {
            Outcome::NotFound => self.apply_raw(&namespace, path, value, flags)?,
            outcome => outcome,
        };
        match outcome {
            Outcome::Changed => {
                self.dirty = true;
                Ok(())
            }
            Outcome::Unchanged => Ok(()),
            Outcome::NotFound => Err(XmpError::path_not_found(path)),
        }
    }

    fn apply_new_model(
        &mut self,
        namespace: &Namespace,
        path: &Path,
        value: &str,
        flags: SyncFlags,
    ) -> XmpResult<Outcome> {
        let Some(mut model) = self.new_model(namespace) else {
            return Ok(Outcome::NotFound);
        };
        let outcome = model_path::apply(&self.ctx, model.as_record_mut(), path, value, flags)?;
        if outcome == Outcome::Changed {
            tracing::trace!(namespace = namespace.prefix(), "created model on write");
            self.bind(model)?;
        }
        Ok(outcome)
    }

    fn apply_raw(
        &mut self,
        namespace: &Namespace,
        path: &Path,
        value: &str,
        flags: SyncFlags,
    ) -> XmpResult<Outcome> {
        let existing = self.tree.find_child_by_ns(self.root, namespace.uri());
        let top = match existing {
            Some(top) => top,
            None if value.is_empty() || self.new_model(namespace).is_some() => {
                return Ok(Outcome::NotFound)
            }
            None => {
                let top = self
                    .tree
                    .acquire(QName::new(namespace.uri(), namespace.prefix()));
                self.tree.append_child(self.root, top);
                top
            }
        };
        let names = RawNames {
            ctx: &self.ctx,
            scope: &self.scope,
        };
        let outcome = rawpath::set(&names, &mut self.tree, top, path, value, flags);
        if existing.is_none() && !matches!(outcome, Ok(Outcome::Changed)) {
            self.tree.release(top);
        }
        outcome
    }

    /// Every value in the document, models and raw content, sorted by path
    pub fn list_paths(&self) -> XmpResult<PathValueList> {
        let names = RawNames {
            ctx: &self.ctx,
            scope: &self.scope,
        };
        let mut out = PathValueList::new();
        for &top in self.tree.children(self.root) {
            if let Some(model) = self.tree[top].model.as_deref() {
                out.extend(model_path::list_model_paths(&self.ctx, model)?);
            }
            out.extend(rawpath::list(&names, &self.tree, top));
        }
        out.sort();
        out.unique();
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Merge and diff
    // ------------------------------------------------------------------

    /// Import the namespaces and all values of `other` under `flags`
    pub fn merge(&mut self, other: &Document, flags: SyncFlags) -> XmpResult<()> {
        for namespace in other.scope.known().sorted() {
            if let Err(e) = self.scope.add_known(namespace) {
                tracing::warn!("skipping namespace on merge: {}", e);
            }
        }
        for namespace in other.scope.external().sorted() {
            if let Err(e) = self.scope.add_external(namespace) {
                tracing::warn!("skipping namespace on merge: {}", e);
            }
        }
        for value in &other.list_paths()? {
            self.set_path(&value.path, &value.value, flags)?;
        }
        if self.about.is_empty() && !other.about.is_empty() {
            self.about = other.about.clone();
        }
        Ok(())
    }

    /// Changes between this document and `other`, see [`PathValueList::diff`]
    pub fn diff(&self, other: &Document) -> XmpResult<PathValueList> {
        Ok(self.list_paths()?.diff(&other.list_paths()?))
    }

    /// Release all nodes and models
    pub fn close(mut self) {
        self.tree.clear();
        self.scope.clear();
    }
}

/// Flags with no transition bit mean the defaults
fn effective(flags: SyncFlags) -> SyncFlags {
    if flags.difference(SyncFlags::NOFAIL).is_empty() {
        SyncFlags::DEFAULT | (flags & SyncFlags::NOFAIL)
    } else {
        flags
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Document {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Document::parse(s)
    }
}
