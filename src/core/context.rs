//! Shared processing context
//!
//! A [`Context`] bundles the state every document operation consults: the
//! namespace registry, the node pool and the type-metadata cache. Most code
//! uses the process-wide [`Context::global`]; tests and embedders that need
//! isolation build their own and hand it to
//! [`Document::with_context`](crate::Document::with_context).

use crate::core::error::XmpResult;
use crate::core::namespace::{Namespace, Registry};
use crate::core::node::{NodePool, DEFAULT_POOL_CAPACITY};
use crate::model::typeinfo::TypeCache;
use crate::schemas;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Arc<Context>> = OnceLock::new();

/// Registry, node pool and type cache shared by documents
#[derive(Debug)]
pub struct Context {
    registry: Registry,
    pool: NodePool,
    types: TypeCache,
}

impl Context {
    /// Create a context with the built-in namespaces and schemas registered
    pub fn new() -> Self {
        Self::with_pool_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Like [`Context::new`] with a custom node pool size
    pub fn with_pool_capacity(capacity: usize) -> Self {
        let ctx = Self {
            registry: Registry::new(),
            pool: NodePool::new(capacity),
            types: TypeCache::new(),
        };
        if let Err(e) = ctx
            .registry
            .register_builtins()
            .and_then(|_| schemas::register_all(&ctx.registry))
        {
            tracing::error!("failed to register built-in namespaces: {}", e);
        }
        ctx
    }

    /// The process-wide context
    pub fn global() -> Arc<Context> {
        GLOBAL.get_or_init(|| Arc::new(Context::new())).clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    pub fn types(&self) -> &TypeCache {
        &self.types
    }

    /// Register a namespace in this context's registry
    pub fn register(&self, ns: Namespace, groups: &[&str]) -> XmpResult<Arc<Namespace>> {
        self.registry.register(ns, groups)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Register a namespace in the global registry
///
/// # Example
///
/// ```
/// use xmpdoc::{register_namespace, get_namespace, Namespace};
///
/// register_namespace(Namespace::new("myapp", "http://example.com/myapp/1.0/"), &["custom"]).unwrap();
/// assert_eq!(get_namespace("myapp").unwrap().uri(), "http://example.com/myapp/1.0/");
/// ```
pub fn register_namespace(ns: Namespace, groups: &[&str]) -> XmpResult<Arc<Namespace>> {
    Context::global().register(ns, groups)
}

/// Namespace registered globally under `prefix`
pub fn get_namespace(prefix: &str) -> Option<Arc<Namespace>> {
    Context::global().registry().get_namespace(prefix)
}

/// Prefix registered globally for `uri`
pub fn get_prefix(uri: &str) -> Option<String> {
    Context::global().registry().get_prefix(uri)
}
