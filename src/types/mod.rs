//! XMP value types
//!
//! Array flavours, language alternatives, nested extension models and the
//! flat path/value exchange format.

pub mod array;
pub mod extension;
pub mod value;

pub use array::{Alt, AltItem, AltString, ArrayType, Bag};
pub use extension::Extensions;
pub use value::{PathValue, PathValueList};
