//! `Field` implementations for standard types

use super::{Field, Kind, List, MapField, Text, View, ViewMut};
use crate::core::error::{XmpError, XmpResult};
use crate::types::array::{Alt, AltString, ArrayType, Bag};
use crate::types::extension::Extensions;
use crate::utils::datetime::XmpDateTime;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};

macro_rules! scalar_field {
    ($ty:ty, $empty:expr) => {
        impl Field for $ty {
            fn kind(&self) -> Kind {
                Kind::Scalar
            }

            fn view(&self) -> View<'_> {
                View::Scalar(self)
            }

            fn view_mut(&mut self) -> ViewMut<'_> {
                ViewMut::Scalar(self)
            }

            fn is_empty(&self) -> bool {
                let empty: fn(&$ty) -> bool = $empty;
                empty(self)
            }

            fn clear(&mut self) {
                *self = <$ty>::default();
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

macro_rules! number_text {
    ($($ty:ty),*) => {
        $(
            impl Text for $ty {
                fn to_text(&self) -> String {
                    self.to_string()
                }

                fn set_text(&mut self, text: &str) -> XmpResult<()> {
                    let text = text.trim();
                    *self = if text.is_empty() {
                        <$ty>::default()
                    } else {
                        text.parse().map_err(|_| {
                            XmpError::BadValue(format!(
                                "'{}' is not a valid {}",
                                text,
                                stringify!($ty)
                            ))
                        })?
                    };
                    Ok(())
                }
            }

            scalar_field!($ty, |v| *v == <$ty>::default());
        )*
    };
}

number_text!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl Text for String {
    fn to_text(&self) -> String {
        self.clone()
    }

    fn set_text(&mut self, text: &str) -> XmpResult<()> {
        self.clear();
        self.push_str(text);
        Ok(())
    }
}

scalar_field!(String, |v| v.is_empty());

impl Text for bool {
    fn to_text(&self) -> String {
        let text = if *self { "True" } else { "False" };
        text.to_string()
    }

    fn set_text(&mut self, text: &str) -> XmpResult<()> {
        *self = match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" | "" => false,
            other => {
                return Err(XmpError::BadValue(format!(
                    "'{}' is not a valid boolean",
                    other
                )))
            }
        };
        Ok(())
    }
}

scalar_field!(bool, |v| !*v);

scalar_field!(XmpDateTime, |v| v.is_zero());

/// Raw byte buffer, written as text without encoding
///
/// Valid UTF-8 passes through unchanged. Other buffers are read one byte per
/// character (Latin-1) so no byte is replaced. Text is stored as its UTF-8 bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Text for Bytes {
    fn to_text(&self) -> String {
        match std::str::from_utf8(&self.0) {
            Ok(text) => text.to_string(),
            Err(_) => self.0.iter().map(|&b| char::from(b)).collect(),
        }
    }

    fn set_text(&mut self, text: &str) -> XmpResult<()> {
        self.0 = text.as_bytes().to_vec();
        Ok(())
    }
}

scalar_field!(Bytes, |v| v.0.is_empty());

impl<T: Field + Default> Field for Option<T> {
    fn kind(&self) -> Kind {
        match self {
            Some(v) => v.kind(),
            None => T::default().kind(),
        }
    }

    fn view(&self) -> View<'_> {
        match self {
            Some(v) => v.view(),
            None => View::Nil,
        }
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        self.get_or_insert_with(T::default).view_mut()
    }

    fn is_empty(&self) -> bool {
        self.as_ref().map_or(true, |v| v.is_empty())
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: Field> Field for Box<T> {
    fn kind(&self) -> Kind {
        (**self).kind()
    }

    fn view(&self) -> View<'_> {
        (**self).view()
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        (**self).view_mut()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Access to the backing vector of list-like fields
trait Items<T> {
    fn items(&self) -> &Vec<T>;
    fn items_mut(&mut self) -> &mut Vec<T>;
}

impl<T> Items<T> for Vec<T> {
    fn items(&self) -> &Vec<T> {
        self
    }

    fn items_mut(&mut self) -> &mut Vec<T> {
        self
    }
}

impl<T> Items<T> for Bag<T> {
    fn items(&self) -> &Vec<T> {
        &self.0
    }

    fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T> Items<T> for Alt<T> {
    fn items(&self) -> &Vec<T> {
        &self.0
    }

    fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

macro_rules! list_impl {
    ($ty:ident, $array:expr) => {
        impl<T: Field + Default> List for $ty<T> {
            fn array_type(&self) -> ArrayType {
                $array
            }

            fn len(&self) -> usize {
                self.items().len()
            }

            fn item(&self, index: usize) -> Option<&dyn Field> {
                self.items().get(index).map(|v| v as &dyn Field)
            }

            fn item_mut(&mut self, index: usize) -> Option<&mut dyn Field> {
                self.items_mut().get_mut(index).map(|v| v as &mut dyn Field)
            }

            fn resize(&mut self, len: usize) -> XmpResult<()> {
                let items = self.items_mut();
                if len > items.len() {
                    items.try_reserve(len - items.len()).map_err(|e| {
                        XmpError::BadValue(format!("cannot grow list to {} items: {}", len, e))
                    })?;
                }
                items.resize_with(len, T::default);
                Ok(())
            }

            fn push_default(&mut self) -> Option<&mut dyn Field> {
                let items = self.items_mut();
                items.push(T::default());
                items.last_mut().map(|v| v as &mut dyn Field)
            }

            fn remove(&mut self, index: usize) {
                let items = self.items_mut();
                if index < items.len() {
                    items.remove(index);
                }
            }

            fn clear(&mut self) {
                self.items_mut().clear();
            }
        }

        impl<T: Field + Default> Field for $ty<T> {
            fn kind(&self) -> Kind {
                Kind::List($array)
            }

            fn view(&self) -> View<'_> {
                View::List(self)
            }

            fn view_mut(&mut self) -> ViewMut<'_> {
                ViewMut::List(self)
            }

            fn is_empty(&self) -> bool {
                self.items().is_empty()
            }

            fn clear(&mut self) {
                self.items_mut().clear();
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

list_impl!(Vec, ArrayType::Ordered);
list_impl!(Bag, ArrayType::Unordered);
list_impl!(Alt, ArrayType::Alternative);

impl<T: Field + Default, const N: usize> List for [T; N] {
    fn array_type(&self) -> ArrayType {
        ArrayType::Ordered
    }

    fn len(&self) -> usize {
        N
    }

    fn item(&self, index: usize) -> Option<&dyn Field> {
        self.get(index).map(|v| v as &dyn Field)
    }

    fn item_mut(&mut self, index: usize) -> Option<&mut dyn Field> {
        self.get_mut(index).map(|v| v as &mut dyn Field)
    }

    fn resizable(&self) -> bool {
        false
    }

    fn resize(&mut self, len: usize) -> XmpResult<()> {
        if len > N {
            return Err(XmpError::BadValue(format!(
                "fixed-size array of {} cannot hold {} items",
                N, len
            )));
        }
        Ok(())
    }

    fn push_default(&mut self) -> Option<&mut dyn Field> {
        None
    }

    fn remove(&mut self, index: usize) {
        if index < N {
            self[index..].rotate_left(1);
            self[N - 1] = T::default();
        }
    }

    fn clear(&mut self) {
        for item in self.iter_mut() {
            *item = T::default();
        }
    }
}

impl<T: Field + Default, const N: usize> Field for [T; N] {
    fn kind(&self) -> Kind {
        Kind::List(ArrayType::Ordered)
    }

    fn view(&self) -> View<'_> {
        View::List(self)
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::List(self)
    }

    fn is_empty(&self) -> bool {
        self.iter().all(|v| v.is_empty())
    }

    fn clear(&mut self) {
        List::clear(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Field for AltString {
    fn kind(&self) -> Kind {
        Kind::AltText
    }

    fn view(&self) -> View<'_> {
        View::AltText(self)
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::AltText(self)
    }

    fn is_empty(&self) -> bool {
        AltString::is_empty(self)
    }

    fn clear(&mut self) {
        AltString::clear(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

macro_rules! map_field {
    ($map:ident, $keys:expr) => {
        impl<T: Field + Default> MapField for $map<String, T> {
            fn keys(&self) -> Vec<String> {
                let keys: fn(&$map<String, T>) -> Vec<String> = $keys;
                keys(self)
            }

            fn entry(&self, key: &str) -> Option<&dyn Field> {
                self.get(key).map(|v| v as &dyn Field)
            }

            fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Field> {
                self.get_mut(key).map(|v| v as &mut dyn Field)
            }

            fn entry_or_default(&mut self, key: &str) -> &mut dyn Field {
                self.entry(key.to_string()).or_default()
            }

            fn remove(&mut self, key: &str) {
                $map::remove(self, key);
            }

            fn len(&self) -> usize {
                $map::len(self)
            }
        }

        impl<T: Field + Default> Field for $map<String, T> {
            fn kind(&self) -> Kind {
                Kind::Map
            }

            fn view(&self) -> View<'_> {
                View::Map(self)
            }

            fn view_mut(&mut self) -> ViewMut<'_> {
                ViewMut::Map(self)
            }

            fn is_empty(&self) -> bool {
                self.values().all(|v| v.is_empty())
            }

            fn clear(&mut self) {
                $map::clear(self)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

map_field!(BTreeMap, |m| m.keys().cloned().collect());
map_field!(HashMap, |m| {
    let mut keys: Vec<String> = m.keys().cloned().collect();
    keys.sort();
    keys
});

impl Field for Extensions {
    fn kind(&self) -> Kind {
        Kind::Extensions
    }

    fn view(&self) -> View<'_> {
        View::Extensions(self)
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Extensions(self)
    }

    fn is_empty(&self) -> bool {
        self.iter().all(|m| m.is_empty())
    }

    fn clear(&mut self) {
        Extensions::clear(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
