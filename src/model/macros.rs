//! Macros for declaring records
//!
//! [`xmp_record!`](crate::xmp_record) implements [`Record`](crate::model::Record)
//! and [`Field`](crate::model::Field) for a struct from a list of
//! `field: "directive"` pairs. The directive grammar is
//!
//! ```text
//! directive := name ( "," option )*  |  "-"
//! option    := "attr" | "empty" | "omit" | "any" | "flat" | "embed"
//!            | "min=" version | "max=" version
//! ```
//!
//! `name` is the qualified XMP name (`dc:title`); an empty name uses the field
//! identifier. `"-"` skips the field entirely.
//!
//! - `attr`: serialize as an attribute instead of an element
//! - `empty`: serialize even when empty
//! - `omit`: never serialize
//! - `any`: catch-all map for unknown child content
//! - `flat`: map entries are siblings of the other fields instead of children
//! - `embed`: promote the fields of a nested record into this one
//! - `min=`/`max=`: inclusive window of schema versions the field exists in
//!
//! The struct must implement `Default`; every field type must implement
//! [`Field`](crate::model::Field).

/// Implement `Record` and `Field` for a struct
///
/// # Example
///
/// ```
/// use xmpdoc::{xmp_record, model::Record};
///
/// #[derive(Debug, Default)]
/// struct Version {
///     comments: String,
///     modifier: String,
///     internal: String,
/// }
///
/// xmp_record!(Version {
///     comments: "stVer:comments",
///     modifier: "stVer:modifier,min=1.1",
///     internal: "-",
/// });
///
/// let v = Version::default();
/// assert_eq!(v.declarations().len(), 3);
/// assert_eq!(v.type_name(), "Version");
/// ```
#[macro_export]
macro_rules! xmp_record {
    ($ty:ident { $( $field:ident : $directive:literal ),* $(,)? }) => {
        impl $crate::model::Record for $ty {
            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn declarations(&self) -> &'static [$crate::model::FieldDecl] {
                const DECLS: &[$crate::model::FieldDecl] = &[
                    $( $crate::model::FieldDecl { ident: stringify!($field), directive: $directive }, )*
                ];
                DECLS
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn field(&self, index: usize) -> Option<&dyn $crate::model::Field> {
                let mut i = 0usize;
                $(
                    if i == index {
                        return Some(&self.$field);
                    }
                    i += 1;
                )*
                None
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn field_mut(&mut self, index: usize) -> Option<&mut dyn $crate::model::Field> {
                let mut i = 0usize;
                $(
                    if i == index {
                        return Some(&mut self.$field);
                    }
                    i += 1;
                )*
                None
            }

            fn as_record(&self) -> &dyn $crate::model::Record {
                self
            }

            fn as_record_mut(&mut self) -> &mut dyn $crate::model::Record {
                self
            }

            fn as_field(&self) -> &dyn $crate::model::Field {
                self
            }

            fn as_field_mut(&mut self) -> &mut dyn $crate::model::Field {
                self
            }
        }

        impl $crate::model::Field for $ty {
            fn kind(&self) -> $crate::model::Kind {
                $crate::model::Kind::Record
            }

            fn view(&self) -> $crate::model::View<'_> {
                $crate::model::View::Record(self)
            }

            fn view_mut(&mut self) -> $crate::model::ViewMut<'_> {
                $crate::model::ViewMut::Record(self)
            }

            fn is_empty(&self) -> bool {
                true $( && $crate::model::Field::is_empty(&self.$field) )*
            }

            fn clear(&mut self) {
                *self = <$ty as ::std::default::Default>::default();
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    };
}
