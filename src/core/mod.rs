//! XMP Core module
//!
//! This module contains the document engine: the namespace registry, the
//! node arena, the packet parser and serializer, the path language and the
//! [`Document`] façade that ties them together.

pub mod context;
pub mod document;
pub mod error;
pub mod flags;
pub mod namespace;
pub mod node;
pub mod options;
pub mod parser;
pub mod serializer;
pub mod xpath;

pub use context::{get_namespace, get_prefix, register_namespace, Context};
pub use document::{Document, DEFAULT_TOOLKIT};
pub use error::{XmpError, XmpResult};
pub use flags::SyncFlags;
pub use namespace::{ns, Namespace, NamespaceMap, NamespaceScope, Registry};
pub use node::{NodeId, QName, Tree};
pub use options::{ParseOptions, SerializeOptions};
pub use parser::XmpParser;
pub use serializer::XmpSerializer;
pub use xpath::{Path, Qualifier, Segment};
