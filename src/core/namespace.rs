//! Namespace management for XMP
//!
//! This module handles namespace registration, lookup, and grouping. XMP uses
//! namespaces to organize properties into schemas; a namespace may carry a
//! factory that builds the typed model for its schema.

use crate::core::error::{XmpError, XmpResult};
use crate::model::{Model, ModelFactory};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Built-in XMP namespaces
pub mod ns {
    /// XMP Basic namespace
    pub const XMP: &str = "http://ns.adobe.com/xap/1.0/";
    /// Dublin Core namespace
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    /// EXIF namespace
    pub const EXIF: &str = "http://ns.adobe.com/exif/1.0/";
    /// TIFF namespace
    pub const TIFF: &str = "http://ns.adobe.com/tiff/1.0/";
    /// Photoshop namespace
    pub const PHOTOSHOP: &str = "http://ns.adobe.com/photoshop/1.0/";
    /// XMP Rights namespace
    pub const XMP_RIGHTS: &str = "http://ns.adobe.com/xap/1.0/rights/";
    /// XMP Media Management namespace
    pub const XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
    /// Resource event structure namespace
    pub const ST_EVT: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceEvent#";
    /// Resource reference structure namespace
    pub const ST_REF: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceRef#";
    /// PDF namespace
    pub const PDF: &str = "http://ns.adobe.com/pdf/1.3/";
    /// RDF namespace
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// XML namespace (for xml:lang, etc.)
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// Adobe meta wrapper namespace (x:xmpmeta)
    pub const X: &str = "adobe:ns:meta/";

    /// XMP namespace prefix
    pub const XMP_PREFIX: &str = "xmp";
    /// Dublin Core prefix
    pub const DC_PREFIX: &str = "dc";
    /// EXIF prefix
    pub const EXIF_PREFIX: &str = "exif";
    /// TIFF prefix
    pub const TIFF_PREFIX: &str = "tiff";
    /// Photoshop prefix
    pub const PHOTOSHOP_PREFIX: &str = "photoshop";
    /// XMP Rights prefix
    pub const XMP_RIGHTS_PREFIX: &str = "xmpRights";
    /// XMP Media Management prefix
    pub const XMP_MM_PREFIX: &str = "xmpMM";
    /// Resource event prefix
    pub const ST_EVT_PREFIX: &str = "stEvt";
    /// Resource reference prefix
    pub const ST_REF_PREFIX: &str = "stRef";
    /// PDF prefix
    pub const PDF_PREFIX: &str = "pdf";
    /// RDF prefix
    pub const RDF_PREFIX: &str = "rdf";
    /// XML prefix
    pub const XML_PREFIX: &str = "xml";
    /// Meta wrapper prefix
    pub const X_PREFIX: &str = "x";
}

/// A namespace: prefix, canonical URI and an optional model factory
#[derive(Clone)]
pub struct Namespace {
    prefix: String,
    uri: String,
    factory: Option<ModelFactory>,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
            factory: None,
        }
    }

    /// Attach the factory that builds this namespace's model
    pub fn with_factory(mut self, factory: ModelFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn factory(&self) -> Option<ModelFactory> {
        self.factory
    }

    /// Build a fresh model, if this namespace is schema-backed
    pub fn new_model(&self) -> Option<Box<dyn Model>> {
        self.factory.map(|factory| factory())
    }

    /// Qualified name `prefix:local`
    pub fn expand(&self, local: &str) -> String {
        format!("{}:{}", self.prefix, local)
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix && self.uri == other.uri
    }
}

impl Eq for Namespace {}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("prefix", &self.prefix)
            .field("uri", &self.uri)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.prefix, self.uri)
    }
}

/// Map of namespaces, indexed by both prefix and URI
///
/// Both keys resolve to the same shared instance.
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    by_prefix: HashMap<String, Arc<Namespace>>,
    by_uri: HashMap<String, Arc<Namespace>>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a namespace
    ///
    /// Returns an error if the prefix is already bound to a different URI.
    /// Re-inserting an identical namespace keeps the first instance, unless the
    /// new one brings a factory the old one lacks.
    pub fn insert(&mut self, ns: Arc<Namespace>) -> XmpResult<Arc<Namespace>> {
        if let Some(existing) = self.by_prefix.get(ns.prefix()) {
            if existing.uri() != ns.uri() {
                return Err(XmpError::BadParam(format!(
                    "Prefix '{}' is already registered to '{}'",
                    ns.prefix(),
                    existing.uri()
                )));
            }
            if existing.factory().is_some() || ns.factory().is_none() {
                return Ok(existing.clone());
            }
        }
        self.by_prefix.insert(ns.prefix().to_string(), ns.clone());
        self.by_uri.insert(ns.uri().to_string(), ns.clone());
        Ok(ns)
    }

    pub fn get_by_prefix(&self, prefix: &str) -> Option<&Arc<Namespace>> {
        self.by_prefix.get(prefix)
    }

    pub fn get_by_uri(&self, uri: &str) -> Option<&Arc<Namespace>> {
        self.by_uri.get(uri)
    }

    /// Look up by prefix first, then by URI
    pub fn get(&self, name: &str) -> Option<&Arc<Namespace>> {
        self.get_by_prefix(name).or_else(|| self.get_by_uri(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove a namespace by prefix or URI, purging both indexes
    pub fn remove(&mut self, name: &str) -> Option<Arc<Namespace>> {
        let ns = self.get(name)?.clone();
        self.by_prefix.remove(ns.prefix());
        self.by_uri.remove(ns.uri());
        Some(ns)
    }

    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }

    /// All namespaces, sorted by prefix
    pub fn sorted(&self) -> Vec<Arc<Namespace>> {
        let sorted: BTreeMap<_, _> = self.by_prefix.iter().collect();
        sorted.into_values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.by_prefix.clear();
        self.by_uri.clear();
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    map: NamespaceMap,
    groups: BTreeMap<String, Vec<Arc<Namespace>>>,
}

/// Process-wide namespace registry
///
/// Registration is additive; entries are never removed. Reads and writes are
/// guarded by a reader/writer lock so registration may happen at any time.
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        // the map stays consistent even if a writer panicked mid-way
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a namespace and add it to zero or more named groups
    pub fn register(&self, ns: Namespace, groups: &[&str]) -> XmpResult<Arc<Namespace>> {
        if ns.uri().is_empty() {
            return Err(XmpError::BadParam("URI cannot be empty".to_string()));
        }
        if ns.prefix().is_empty() {
            return Err(XmpError::BadParam("Prefix cannot be empty".to_string()));
        }
        let mut inner = self.write();
        let ns = inner.map.insert(Arc::new(ns))?;
        for group in groups {
            let members = inner.groups.entry(group.to_string()).or_default();
            if !members.iter().any(|m| m.prefix() == ns.prefix()) {
                members.push(ns.clone());
            }
        }
        Ok(ns)
    }

    /// Namespace registered under `prefix`
    pub fn get_namespace(&self, prefix: &str) -> Option<Arc<Namespace>> {
        self.read().map.get_by_prefix(prefix).cloned()
    }

    /// Namespace registered for `uri`
    pub fn get_by_uri(&self, uri: &str) -> Option<Arc<Namespace>> {
        self.read().map.get_by_uri(uri).cloned()
    }

    /// Prefix registered for `uri`
    pub fn get_prefix(&self, uri: &str) -> Option<String> {
        self.read().map.get_by_uri(uri).map(|ns| ns.prefix().to_string())
    }

    /// Look up by prefix or URI
    pub fn lookup(&self, name: &str) -> Option<Arc<Namespace>> {
        self.read().map.get(name).cloned()
    }

    /// Members of a named group
    pub fn group(&self, name: &str) -> Vec<Arc<Namespace>> {
        self.read().groups.get(name).cloned().unwrap_or_default()
    }

    pub fn group_names(&self) -> Vec<String> {
        self.read().groups.keys().cloned().collect()
    }

    /// All registered namespaces, sorted by prefix
    pub fn all(&self) -> Vec<Arc<Namespace>> {
        self.read().map.sorted()
    }

    /// Register the RDF, XML and meta-wrapper namespaces plus well-known schema URIs
    pub(crate) fn register_builtins(&self) -> XmpResult<()> {
        let core = [
            (ns::RDF_PREFIX, ns::RDF),
            (ns::XML_PREFIX, ns::XML),
            (ns::X_PREFIX, ns::X),
        ];
        for (prefix, uri) in core {
            self.register(Namespace::new(prefix, uri), &["core"])?;
        }
        let known = [
            (ns::EXIF_PREFIX, ns::EXIF, "exif"),
            (ns::TIFF_PREFIX, ns::TIFF, "exif"),
            (ns::PHOTOSHOP_PREFIX, ns::PHOTOSHOP, "photoshop"),
            (ns::XMP_RIGHTS_PREFIX, ns::XMP_RIGHTS, "xmp"),
            (ns::PDF_PREFIX, ns::PDF, "pdf"),
        ];
        for (prefix, uri, group) in known {
            self.register(Namespace::new(prefix, uri), &[group])?;
        }
        Ok(())
    }
}

/// Namespaces in use by one document
///
/// `known` holds schema-backed namespaces of bound models, `external` holds
/// namespaces seen on the wire without a model. Lookups fall back to the
/// process-wide registry.
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    known: NamespaceMap,
    external: NamespaceMap,
}

impl NamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known(&self) -> &NamespaceMap {
        &self.known
    }

    pub fn external(&self) -> &NamespaceMap {
        &self.external
    }

    pub fn add_known(&mut self, ns: Arc<Namespace>) -> XmpResult<Arc<Namespace>> {
        self.external.remove(ns.prefix());
        self.known.insert(ns)
    }

    pub fn add_external(&mut self, ns: Arc<Namespace>) -> XmpResult<Arc<Namespace>> {
        if let Some(existing) = self.known.get_by_uri(ns.uri()) {
            return Ok(existing.clone());
        }
        self.external.insert(ns)
    }

    /// Resolve a prefix or URI: known, then external, then the registry
    pub fn lookup(&self, registry: &Registry, name: &str) -> Option<Arc<Namespace>> {
        self.known
            .get(name)
            .or_else(|| self.external.get(name))
            .cloned()
            .or_else(|| registry.lookup(name))
    }

    /// Prefix to use on the wire for `uri`
    pub fn prefix_for(&self, registry: &Registry, uri: &str) -> Option<String> {
        self.known
            .get_by_uri(uri)
            .or_else(|| self.external.get_by_uri(uri))
            .map(|ns| ns.prefix().to_string())
            .or_else(|| registry.get_prefix(uri))
    }

    /// Drop a namespace from both maps
    pub fn remove(&mut self, name: &str) -> Option<Arc<Namespace>> {
        let known = self.known.remove(name);
        let external = self.external.remove(name);
        known.or(external)
    }

    /// All namespaces in use, known first, each sorted by prefix
    pub fn all(&self) -> Vec<Arc<Namespace>> {
        let mut all = self.known.sorted();
        all.extend(self.external.sorted());
        all
    }

    pub fn clear(&mut self) {
        self.known.clear();
        self.external.clear();
    }
}
