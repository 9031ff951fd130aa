//! Typed schema models
//!
//! A model is a plain Rust struct whose fields map to XMP properties. Field
//! metadata comes from the [`xmp_record!`](crate::xmp_record) macro, which
//! implements [`Record`] and [`Field`] for the struct. Marshal, unmarshal and
//! the path engine all work through the object-safe [`Field`] view, so they
//! never need to know the concrete type.
//!
//! # Example
//!
//! ```
//! use xmpdoc::{xmp_record, Model, Namespace, AltString};
//!
//! #[derive(Debug, Default)]
//! pub struct Photo {
//!     pub title: AltString,
//!     pub rating: i64,
//!     pub keywords: Vec<String>,
//! }
//!
//! xmp_record!(Photo {
//!     title: "photo:Title",
//!     rating: "photo:Rating,attr",
//!     keywords: "photo:Keywords",
//! });
//!
//! impl Model for Photo {
//!     fn namespaces(&self) -> Vec<Namespace> {
//!         vec![Namespace::new("photo", "http://example.com/photo/")]
//!     }
//! }
//! ```

mod impls;
pub mod macros;
pub mod marshal;
pub mod path;
pub mod typeinfo;
pub mod unmarshal;

use crate::core::error::XmpResult;
use crate::core::namespace::Namespace;
use crate::model::marshal::Encoder;
use crate::model::unmarshal::Decoder;
use crate::core::node::NodeId;
use crate::types::array::{AltString, ArrayType};
use crate::types::extension::Extensions;
use std::any::Any;

pub use impls::Bytes;

/// Builds an empty model for a namespace
pub type ModelFactory = fn() -> Box<dyn Model>;

/// Static shape of a field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Value with a text form
    Scalar,
    /// Nested record
    Record,
    /// Array of values
    List(ArrayType),
    /// Language alternative
    AltText,
    /// String-keyed map
    Map,
    /// Nested models keyed by namespace
    Extensions,
    /// Type with its own wire codec
    Custom,
}

/// Read-only view of a field value
pub enum View<'a> {
    /// Absent optional value
    Nil,
    Scalar(&'a dyn Text),
    Record(&'a dyn Record),
    List(&'a dyn List),
    AltText(&'a AltString),
    Map(&'a dyn MapField),
    Extensions(&'a Extensions),
    Custom(&'a dyn CustomMarshal),
}

/// Mutable view of a field value
///
/// Optional values are materialized with their default before the view is taken.
pub enum ViewMut<'a> {
    Scalar(&'a mut dyn Text),
    Record(&'a mut dyn Record),
    List(&'a mut dyn List),
    AltText(&'a mut AltString),
    Map(&'a mut dyn MapField),
    Extensions(&'a mut Extensions),
    Custom(&'a mut dyn CustomMarshal),
}

/// A value that can live in a model field
pub trait Field: Any + Send + Sync {
    fn kind(&self) -> Kind;
    fn view(&self) -> View<'_>;
    fn view_mut(&mut self) -> ViewMut<'_>;
    /// Whether the value counts as unset
    fn is_empty(&self) -> bool;
    /// Reset to the empty value
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Text conversion of scalar values
pub trait Text: Send + Sync {
    fn to_text(&self) -> String;
    /// Parse `text` into the value; empty text resets it
    fn set_text(&mut self, text: &str) -> XmpResult<()>;
}

/// An array field
pub trait List: Send + Sync {
    fn array_type(&self) -> ArrayType;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn item(&self, index: usize) -> Option<&dyn Field>;
    fn item_mut(&mut self, index: usize) -> Option<&mut dyn Field>;
    /// Whether the length can change
    fn resizable(&self) -> bool {
        true
    }
    /// Grow to `len` items, filling with defaults
    fn resize(&mut self, len: usize) -> XmpResult<()>;
    /// Append a default item and return it, `None` for fixed-size arrays
    fn push_default(&mut self) -> Option<&mut dyn Field>;
    fn remove(&mut self, index: usize);
    fn clear(&mut self);
}

/// A string-keyed map field
pub trait MapField: Send + Sync {
    /// Keys in a stable order
    fn keys(&self) -> Vec<String>;
    fn entry(&self, key: &str) -> Option<&dyn Field>;
    fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Field>;
    /// Insert a default value under `key` unless present and return it
    fn entry_or_default(&mut self, key: &str) -> &mut dyn Field;
    fn remove(&mut self, key: &str);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A type that writes and reads its own wire representation
pub trait CustomMarshal: Send + Sync {
    /// Fill `node`, an element already created for this field
    fn marshal_xmp(&self, enc: &mut Encoder<'_>, node: NodeId) -> XmpResult<()>;
    /// Read from `node` of the wire tree
    fn unmarshal_xmp(&mut self, dec: &mut Decoder<'_>, node: NodeId) -> XmpResult<()>;
    /// Text form for path access, if the type has one
    fn as_text(&self) -> Option<&dyn Text> {
        None
    }
    fn as_text_mut(&mut self) -> Option<&mut dyn Text> {
        None
    }
}

/// Declaration of one struct field: its identifier and tag directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    pub ident: &'static str,
    pub directive: &'static str,
}

/// A struct with declared fields
pub trait Record: Field {
    fn type_name(&self) -> &'static str;
    fn declarations(&self) -> &'static [FieldDecl];
    fn field(&self, index: usize) -> Option<&dyn Field>;
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Field>;
    fn as_record(&self) -> &dyn Record;
    fn as_record_mut(&mut self) -> &mut dyn Record;
    fn as_field(&self) -> &dyn Field;
    fn as_field_mut(&mut self) -> &mut dyn Field;
}

/// A record bound to one or more namespaces
pub trait Model: Record {
    /// Namespaces covered by this model, primary first
    fn namespaces(&self) -> Vec<Namespace>;

    /// Whether this model handles a prefix, a URI or a `prefix:name`
    fn can(&self, name: &str) -> bool {
        let prefix = match name.split_once(':') {
            Some((prefix, _)) if !name.contains('/') => prefix,
            _ => name,
        };
        self.namespaces()
            .iter()
            .any(|ns| ns.prefix() == prefix || ns.uri() == name)
    }

    /// Called after the model was decoded from the wire
    fn sync_from_xmp(&mut self) -> XmpResult<()> {
        Ok(())
    }

    /// Called before the model is encoded
    fn sync_to_xmp(&mut self) -> XmpResult<()> {
        Ok(())
    }

    /// Pull values from another model of the same document
    fn sync_model(&mut self, _other: &dyn Model) -> XmpResult<()> {
        Ok(())
    }
}

impl<'a> dyn Model + 'a {
    /// Downcast to a concrete model type
    pub fn downcast_ref<T: Model>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Model>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Primary namespace
    pub fn primary_namespace(&self) -> Option<Namespace> {
        self.namespaces().into_iter().next()
    }
}

/// Field at a nested index path of a record
pub fn field_at<'a>(record: &'a dyn Record, index: &[usize]) -> Option<&'a dyn Field> {
    let (first, rest) = index.split_first()?;
    let field = record.field(*first)?;
    if rest.is_empty() {
        return Some(field);
    }
    match field.view() {
        View::Record(inner) => field_at(inner, rest),
        _ => None,
    }
}

/// Mutable field at a nested index path of a record
pub fn field_at_mut<'a>(record: &'a mut dyn Record, index: &[usize]) -> Option<&'a mut dyn Field> {
    let (first, rest) = index.split_first()?;
    let field = record.field_mut(*first)?;
    if rest.is_empty() {
        return Some(field);
    }
    match field.view_mut() {
        ViewMut::Record(inner) => field_at_mut(inner, rest),
        _ => None,
    }
}
