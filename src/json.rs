//! JSON transcoding of documents
//!
//! A document maps to
//!
//! ```json
//! {
//!   "about": "",
//!   "toolkit": "",
//!   "namespaces": { "dc": "http://purl.org/dc/elements/1.1/" },
//!   "models": { "dc": { "format": "image/png", "title": "Sunset" } }
//! }
//! ```
//!
//! Model fields use their local names. Arrays become JSON arrays. A language
//! alternative holding only an untagged default becomes a bare string, any
//! other alternative an array of `{value, lang, isDefault}` objects. Raw
//! content without a model is not transcoded.

use crate::core::context::Context;
use crate::core::document::Document;
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::Namespace;
use crate::model::typeinfo::TagNamespace;
use crate::model::{field_at, field_at_mut, Field, List, Record, View, ViewMut};
use crate::types::array::{AltItem, AltString};
use serde_json::{Map, Value};
use std::sync::Arc;

impl Document {
    /// JSON form of the document and its bound models
    pub fn to_json(&self) -> XmpResult<Value> {
        let ctx = self.context();
        let mut namespaces = Map::new();
        for namespace in self.namespaces() {
            namespaces.insert(
                namespace.prefix().to_string(),
                Value::String(namespace.uri().to_string()),
            );
        }
        let mut models = Map::new();
        for model in self.models() {
            let Some(primary) = model.primary_namespace() else {
                continue;
            };
            models.insert(
                primary.prefix().to_string(),
                record_to_json(ctx, model.as_record())?,
            );
        }

        let mut out = Map::new();
        out.insert("about".into(), Value::String(self.about().to_string()));
        out.insert("toolkit".into(), Value::String(self.toolkit().to_string()));
        out.insert("namespaces".into(), Value::Object(namespaces));
        out.insert("models".into(), Value::Object(models));
        Ok(Value::Object(out))
    }

    /// Build a document on the global context from its JSON form
    pub fn from_json(value: &Value) -> XmpResult<Self> {
        Self::from_json_with(Context::global(), value)
    }

    pub fn from_json_with(ctx: Arc<Context>, value: &Value) -> XmpResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| XmpError::BadParam("JSON document must be an object".into()))?;
        let mut doc = Document::with_context(ctx.clone());
        if let Some(about) = obj.get("about").and_then(Value::as_str) {
            doc.set_about(about);
        }
        if let Some(toolkit) = obj.get("toolkit").and_then(Value::as_str) {
            doc.set_toolkit(toolkit);
        }
        if let Some(namespaces) = obj.get("namespaces").and_then(Value::as_object) {
            for (prefix, uri) in namespaces {
                let uri = uri.as_str().ok_or_else(|| {
                    XmpError::BadValue(format!("namespace URI for '{}' must be a string", prefix))
                })?;
                doc.add_namespace(Namespace::new(prefix.as_str(), uri))?;
            }
        }
        if let Some(models) = obj.get("models").and_then(Value::as_object) {
            for (name, body) in models {
                let model = doc.make_model(name)?;
                record_from_json(&ctx, model.as_record_mut(), body)?;
            }
        }
        doc.clear_dirty();
        Ok(doc)
    }
}

fn record_to_json(ctx: &Context, record: &dyn Record) -> XmpResult<Value> {
    let info = ctx.types().get(record, TagNamespace::Json)?;
    let mut out = Map::new();
    for f in &info.fields {
        let Some(field) = field_at(record, &f.index) else {
            continue;
        };
        if field.is_empty() {
            continue;
        }
        match (f.is_catch_all(), field_to_json(ctx, field)?) {
            (true, Value::Object(entries)) => out.extend(entries),
            (_, Value::Null) => {}
            (_, value) => {
                out.insert(f.name.clone(), value);
            }
        }
    }
    Ok(Value::Object(out))
}

fn field_to_json(ctx: &Context, field: &dyn Field) -> XmpResult<Value> {
    Ok(match field.view() {
        View::Nil => Value::Null,
        View::Scalar(text) => Value::String(text.to_text()),
        View::Custom(custom) => custom
            .as_text()
            .map(|text| Value::String(text.to_text()))
            .unwrap_or(Value::Null),
        View::Record(record) => record_to_json(ctx, record)?,
        View::List(list) => {
            let mut items = Vec::with_capacity(list.len());
            for i in 0..list.len() {
                if let Some(item) = list.item(i) {
                    items.push(field_to_json(ctx, item)?);
                }
            }
            Value::Array(items)
        }
        View::AltText(alt) => alt_to_json(alt)?,
        View::Map(map) => {
            let mut out = Map::new();
            for key in map.keys() {
                if let Some(entry) = map.entry(&key) {
                    out.insert(key, field_to_json(ctx, entry)?);
                }
            }
            Value::Object(out)
        }
        View::Extensions(extensions) => {
            let mut out = Map::new();
            for model in extensions.iter() {
                if let Some(primary) = model.primary_namespace() {
                    out.insert(
                        primary.prefix().to_string(),
                        record_to_json(ctx, model.as_record())?,
                    );
                }
            }
            Value::Object(out)
        }
    })
}

fn alt_to_json(alt: &AltString) -> XmpResult<Value> {
    if let [only] = alt.items() {
        if only.is_default && only.lang.is_empty() {
            return Ok(Value::String(only.value.clone()));
        }
    }
    serde_json::to_value(alt.items()).map_err(|e| XmpError::SerializationError(e.to_string()))
}

fn record_from_json(ctx: &Context, record: &mut dyn Record, value: &Value) -> XmpResult<()> {
    let obj = value.as_object().ok_or_else(|| {
        XmpError::BadValue(format!("{} must be a JSON object", record.type_name()))
    })?;
    let info = ctx.types().get(record, TagNamespace::Json)?;
    for (key, value) in obj {
        let target = info
            .fields
            .iter()
            .find(|f| f.name == *key && !f.is_catch_all());
        match target {
            Some(f) => {
                let field = field_at_mut(record, &f.index).ok_or_else(|| {
                    XmpError::InternalError(format!("field {} is not addressable", f.ident))
                })?;
                field_from_json(ctx, field, value)?;
            }
            None => match info.catch_all() {
                Some(f) => {
                    let field = field_at_mut(record, &f.index).ok_or_else(|| {
                        XmpError::InternalError(format!("field {} is not addressable", f.ident))
                    })?;
                    if let ViewMut::Map(map) = field.view_mut() {
                        field_from_json(ctx, map.entry_or_default(key), value)?;
                    }
                }
                None => tracing::debug!(field = %key, "skipping unknown JSON field"),
            },
        }
    }
    Ok(())
}

fn field_from_json(ctx: &Context, field: &mut dyn Field, value: &Value) -> XmpResult<()> {
    if value.is_null() {
        field.clear();
        return Ok(());
    }
    match field.view_mut() {
        ViewMut::Scalar(text) => text.set_text(&scalar_text(value)?),
        ViewMut::Custom(custom) => match custom.as_text_mut() {
            Some(text) => text.set_text(&scalar_text(value)?),
            None => Err(XmpError::NotSupported(
                "custom field without a text form".into(),
            )),
        },
        ViewMut::Record(record) => record_from_json(ctx, record, value),
        ViewMut::List(list) => match value {
            Value::Array(items) => fill_list(ctx, list, items),
            single => fill_list(ctx, list, std::slice::from_ref(single)),
        },
        ViewMut::AltText(alt) => alt_from_json(alt, value),
        ViewMut::Map(map) => {
            let obj = value
                .as_object()
                .ok_or_else(|| XmpError::BadValue("map must be a JSON object".into()))?;
            for (key, entry) in obj {
                field_from_json(ctx, map.entry_or_default(key), entry)?;
            }
            Ok(())
        }
        ViewMut::Extensions(extensions) => {
            let obj = value
                .as_object()
                .ok_or_else(|| XmpError::BadValue("extensions must be a JSON object".into()))?;
            for (prefix, body) in obj {
                let namespace = ctx
                    .registry()
                    .lookup(prefix)
                    .ok_or_else(|| XmpError::UnknownNamespace(prefix.clone()))?;
                let mut model = namespace.new_model().ok_or_else(|| {
                    XmpError::NotSupported(format!("namespace {} has no model", prefix))
                })?;
                record_from_json(ctx, model.as_record_mut(), body)?;
                extensions.insert(model);
            }
            Ok(())
        }
    }
}

fn fill_list(ctx: &Context, list: &mut dyn List, items: &[Value]) -> XmpResult<()> {
    list.clear();
    for (i, item) in items.iter().enumerate() {
        let slot = if list.resizable() {
            list.push_default()
        } else {
            list.item_mut(i)
        };
        let slot = slot.ok_or_else(|| {
            XmpError::MalformedArray(format!("no room for item {} of {}", i + 1, items.len()))
        })?;
        field_from_json(ctx, slot, item)?;
    }
    Ok(())
}

fn alt_from_json(alt: &mut AltString, value: &Value) -> XmpResult<()> {
    match value {
        Value::String(s) => *alt = AltString::from_default(s.as_str()),
        Value::Array(items) => {
            alt.clear();
            for item in items {
                let item: AltItem = match item {
                    Value::String(s) => AltItem::new("", s.as_str()),
                    other => serde_json::from_value(other.clone())
                        .map_err(|e| XmpError::BadValue(format!("alternative item: {}", e)))?,
                };
                alt.push(item);
            }
        }
        other => {
            return Err(XmpError::BadValue(format!(
                "alternative text must be a string or an array, got {}",
                other
            )))
        }
    }
    Ok(())
}

fn scalar_text(value: &Value) -> XmpResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(XmpError::BadValue(format!("expected a scalar, got {}", other))),
    }
}
