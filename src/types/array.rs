//! XMP array types
//!
//! XMP knows three array flavours: ordered (`rdf:Seq`), unordered (`rdf:Bag`)
//! and alternative (`rdf:Alt`). Plain `Vec<T>` fields are ordered arrays,
//! [`Bag`] and [`Alt`] mark the other two. [`AltString`] is the language
//! alternative used for localized text such as `dc:title`.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::ns;
use crate::core::node::{NodeId, QName, Tree};
use std::ops::{Deref, DerefMut};

/// Type of array node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayType {
    /// Ordered array (rdf:Seq)
    Ordered,
    /// Unordered array (rdf:Bag)
    Unordered,
    /// Alternative array (rdf:Alt)
    Alternative,
}

impl ArrayType {
    /// Get the RDF type name for this array type
    pub fn rdf_type(&self) -> &'static str {
        match self {
            ArrayType::Ordered => "Seq",
            ArrayType::Unordered => "Bag",
            ArrayType::Alternative => "Alt",
        }
    }

    /// Array type of an RDF container name
    pub fn from_rdf_type(local: &str) -> Option<Self> {
        match local {
            "Seq" => Some(ArrayType::Ordered),
            "Bag" => Some(ArrayType::Unordered),
            "Alt" => Some(ArrayType::Alternative),
            _ => None,
        }
    }
}

macro_rules! array_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name<T>(pub Vec<T>);

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self(Vec::new())
            }
        }

        impl<T> Deref for $name<T> {
            type Target = Vec<T>;

            fn deref(&self) -> &Vec<T> {
                &self.0
            }
        }

        impl<T> DerefMut for $name<T> {
            fn deref_mut(&mut self) -> &mut Vec<T> {
                &mut self.0
            }
        }

        impl<T> From<Vec<T>> for $name<T> {
            fn from(items: Vec<T>) -> Self {
                Self(items)
            }
        }

        impl<T> FromIterator<T> for $name<T> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                Self(iter.into_iter().collect())
            }
        }

        impl<T> IntoIterator for $name<T> {
            type Item = T;
            type IntoIter = std::vec::IntoIter<T>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }
    };
}

array_newtype!(
    /// Unordered array, serialized as `rdf:Bag`
    Bag
);

array_newtype!(
    /// Alternative array without language tags, serialized as `rdf:Alt`
    Alt
);

/// Language tag of the default alternative on the wire
pub const X_DEFAULT: &str = "x-default";

/// One entry of a language alternative
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct AltItem {
    pub value: String,
    /// Language tag, may be empty for the default entry
    pub lang: String,
    pub is_default: bool,
}

impl AltItem {
    pub fn new(lang: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: lang.into(),
            is_default: false,
        }
    }
}

/// Language alternative text
///
/// At most one entry is the default; after every mutation through this type
/// the default entry, if any, sits at index 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltString {
    items: Vec<AltItem>,
}

impl AltString {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single default entry without language
    pub fn from_default(value: impl Into<String>) -> Self {
        let mut alt = Self::new();
        alt.set(X_DEFAULT, value);
        alt
    }

    pub fn items(&self) -> &[AltItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|i| i.value.is_empty())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Value of the default entry, or of the first entry if none is marked
    pub fn default_value(&self) -> &str {
        self.items
            .iter()
            .find(|i| i.is_default)
            .or_else(|| self.items.first())
            .map(|i| i.value.as_str())
            .unwrap_or("")
    }

    /// Position of the entry addressed by `lang`; `x-default` or empty means the default
    pub fn position(&self, lang: &str) -> Option<usize> {
        if lang.is_empty() || lang == X_DEFAULT {
            return self
                .items
                .iter()
                .position(|i| i.is_default)
                .or(if self.items.is_empty() { None } else { Some(0) });
        }
        self.items
            .iter()
            .position(|i| i.lang.eq_ignore_ascii_case(lang))
    }

    /// Value for a language tag
    pub fn get(&self, lang: &str) -> Option<&str> {
        self.position(lang).map(|i| self.items[i].value.as_str())
    }

    /// Add or update the entry for `lang`
    ///
    /// A new default value never overwrites a default that carries its own
    /// language: a language-less default is inserted in front and the old
    /// entry stays as the alternative for its language.
    pub fn set(&mut self, lang: &str, value: impl Into<String>) {
        let value = value.into();
        let is_default = lang.is_empty() || lang == X_DEFAULT;
        match self.position(lang) {
            Some(i) if is_default && !self.items[i].lang.is_empty() && !value.is_empty() => {
                if self.items[i].value != value {
                    self.items[i].is_default = false;
                    self.items.insert(
                        0,
                        AltItem {
                            value,
                            lang: String::new(),
                            is_default: true,
                        },
                    );
                }
            }
            Some(i) => self.items[i].value = value,
            None => {
                self.items.push(AltItem {
                    value,
                    lang: if is_default { String::new() } else { lang.to_string() },
                    is_default,
                });
            }
        }
        self.ensure_default();
    }

    /// Add an entry for `lang` and make it the default
    pub fn set_default(&mut self, lang: &str, value: impl Into<String>) {
        if lang.is_empty() || lang == X_DEFAULT {
            return self.set(X_DEFAULT, value);
        }
        let value = value.into();
        for item in self.items.iter_mut() {
            item.is_default = false;
        }
        match self.position(lang) {
            Some(i) => {
                self.items[i].value = value;
                self.items[i].is_default = true;
            }
            None => self.items.insert(
                0,
                AltItem {
                    value,
                    lang: lang.to_string(),
                    is_default: true,
                },
            ),
        }
        self.ensure_default();
    }

    /// Push an entry as-is
    pub fn push(&mut self, item: AltItem) {
        self.items.push(item);
        self.ensure_default();
    }

    /// Remove the entry for `lang`
    pub fn remove(&mut self, lang: &str) -> Option<AltItem> {
        let pos = self.position(lang)?;
        Some(self.remove_at(pos))
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> AltItem {
        let item = self.items.remove(index);
        self.ensure_default();
        item
    }

    pub(crate) fn item_mut(&mut self, index: usize) -> Option<&mut AltItem> {
        self.items.get_mut(index)
    }

    /// Normalize the default marker
    ///
    /// The first entry marked default is kept and moved to index 0, other marks
    /// are cleared. A non-empty list without any mark gets its first entry marked.
    pub fn ensure_default(&mut self) {
        ensure_default(&mut self.items);
    }

    /// Append this alternative below `element` as an `rdf:Alt` container
    ///
    /// The default entry is written first with `xml:lang="x-default"` and, when
    /// it carries its own language, written again with that language.
    pub(crate) fn write_nodes(&self, tree: &mut Tree, element: NodeId) -> XmpResult<()> {
        let mut items = self.items.clone();
        ensure_default(&mut items);
        let container = tree.acquire(QName::rdf(ArrayType::Alternative.rdf_type()));
        tree.append_child(element, container);
        for (i, item) in items.iter().enumerate() {
            if item.is_default {
                append_li(tree, container, X_DEFAULT, &item.value);
                if !item.lang.is_empty() && item.lang != X_DEFAULT {
                    append_li(tree, container, &item.lang, &item.value);
                }
            } else if item.lang.is_empty() {
                return Err(XmpError::BadValue(format!(
                    "alternative entry {} is not the default and has no language",
                    i
                )));
            } else {
                append_li(tree, container, &item.lang, &item.value);
            }
        }
        Ok(())
    }

    /// Read an alternative from the array element `element`
    ///
    /// The `x-default` entry and a following entry with the same value are
    /// collapsed into one default entry carrying that entry's language.
    pub(crate) fn read_nodes(tree: &Tree, element: NodeId) -> XmpResult<Self> {
        let mut alt = AltString::new();
        let children = tree.children(element);
        if children.is_empty() {
            let value = &tree[element].value;
            if !value.trim().is_empty() {
                alt.items.push(AltItem {
                    value: value.clone(),
                    lang: String::new(),
                    is_default: true,
                });
            }
            return Ok(alt);
        }
        let [container] = children else {
            return Err(XmpError::MalformedArray(format!(
                "expected one container below {}, found {}",
                tree[element].name.local,
                children.len()
            )));
        };
        let container_name = &tree[*container].name;
        if container_name.space != ns::RDF
            || ArrayType::from_rdf_type(&container_name.local).is_none()
        {
            return Err(XmpError::MalformedArray(format!(
                "unexpected container {}",
                container_name
            )));
        }
        for &li in tree.children(*container) {
            let node = &tree[li];
            if !node.name.is_rdf("li") {
                return Err(XmpError::MalformedArray(format!(
                    "unexpected array item {}",
                    node.name
                )));
            }
            let lang = node.attr(ns::XML, "lang").unwrap_or("");
            let is_default = lang == X_DEFAULT;
            alt.items.push(AltItem {
                value: node.value.clone(),
                lang: if is_default { String::new() } else { lang.to_string() },
                is_default,
            });
        }
        alt.fold_default_duplicate();
        alt.ensure_default();
        Ok(alt)
    }

    fn fold_default_duplicate(&mut self) {
        let Some(default) = self
            .items
            .iter()
            .position(|i| i.is_default && i.lang.is_empty())
        else {
            return;
        };
        let value = self.items[default].value.clone();
        let duplicate = self
            .items
            .iter()
            .enumerate()
            .position(|(i, item)| i != default && !item.lang.is_empty() && item.value == value);
        if let Some(dup_index) = duplicate {
            let dup = self.items.remove(dup_index);
            let default = if dup_index < default { default - 1 } else { default };
            self.items[default].lang = dup.lang;
        }
    }
}

fn append_li(tree: &mut Tree, container: NodeId, lang: &str, value: &str) {
    let li = tree.acquire_text(QName::rdf("li"), value);
    tree.set_attr(li, QName::new(ns::XML, "lang"), lang);
    tree.append_child(container, li);
}

/// Normalize the default marker of a list of alternative entries
pub fn ensure_default(items: &mut Vec<AltItem>) {
    match items.iter().position(|i| i.is_default) {
        Some(pos) => {
            for (i, item) in items.iter_mut().enumerate() {
                if i != pos {
                    item.is_default = false;
                }
            }
            if pos != 0 {
                let item = items.remove(pos);
                items.insert(0, item);
            }
        }
        None => {
            if let Some(first) = items.first_mut() {
                first.is_default = true;
            }
        }
    }
}

impl FromIterator<AltItem> for AltString {
    fn from_iter<I: IntoIterator<Item = AltItem>>(iter: I) -> Self {
        let mut alt = Self {
            items: iter.into_iter().collect(),
        };
        alt.ensure_default();
        alt
    }
}
