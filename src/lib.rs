//! # xmpdoc
//!
//! Typed XMP documents.
//!
//! Metadata schemas are plain Rust structs described with
//! [`xmp_record!`]. A [`Document`] binds such models to their namespaces,
//! parses RDF/XML packets into them, keeps whatever no model describes as raw
//! nodes, and writes everything back out as a packet. Values are addressed by
//! a small path language (`dc:title[x-default]`, `xmpMM:History[1]/stEvt:action`)
//! and copied between paths under [`SyncFlags`] rules.
//!
//! ## Quick start
//!
//! ```
//! use xmpdoc::{Document, SerializeOptions, SyncFlags};
//!
//! let mut doc = Document::new();
//! doc.set("dc:title", "Harbor at dawn", SyncFlags::DEFAULT).unwrap();
//! doc.set("xmp:Rating", "4", SyncFlags::DEFAULT).unwrap();
//!
//! let xml = doc.serialize_with(SerializeOptions::default().compact()).unwrap();
//! let parsed = Document::parse(&xml).unwrap();
//! assert_eq!(parsed.get("xmp:Rating").unwrap(), "4");
//! ```
//!
//! ## Features
//!
//! - `serde`: JSON transcoding of documents and `Serialize` for value types

pub mod core;
#[cfg(feature = "serde")]
pub mod json;
pub mod model;
pub mod schemas;
pub mod types;
pub mod utils;

pub use core::context::{get_namespace, get_prefix, register_namespace, Context};
pub use core::document::{Converter, Document, DEFAULT_TOOLKIT};
pub use core::error::{XmpError, XmpResult};
pub use core::flags::SyncFlags;
pub use core::namespace::{ns, Namespace, NamespaceScope, Registry};
pub use core::options::{ParseOptions, SerializeOptions};
pub use core::xpath::{Path, Qualifier, Segment};
pub use model::{Field, Model, Record};
pub use types::{Alt, AltItem, AltString, ArrayType, Bag, Extensions, PathValue, PathValueList};
pub use utils::{Version, XmpDateTime};
