//! Reference schema models
//!
//! Models for Dublin Core, XMP Basic and XMP Media Management. Their
//! namespaces are registered with model factories when a
//! [`Context`](crate::Context) is created, so documents create them on demand.

pub mod dc;
pub mod xmp;
pub mod xmp_mm;

use crate::core::error::XmpResult;
use crate::core::namespace::{ns, Namespace, Registry};

pub use dc::DublinCore;
pub use xmp::XmpBasic;
pub use xmp_mm::{MediaManagement, ResourceEvent, ResourceRef};

/// Register the reference schemas and their factories
pub fn register_all(registry: &Registry) -> XmpResult<()> {
    registry.register(
        Namespace::new(ns::DC_PREFIX, ns::DC).with_factory(dc::new_model),
        &["dc", "xmp"],
    )?;
    registry.register(
        Namespace::new(ns::XMP_PREFIX, ns::XMP).with_factory(xmp::new_model),
        &["xmp"],
    )?;
    registry.register(
        Namespace::new(ns::XMP_MM_PREFIX, ns::XMP_MM).with_factory(xmp_mm::new_model),
        &["xmp"],
    )?;
    registry.register(Namespace::new(ns::ST_EVT_PREFIX, ns::ST_EVT), &["xmp"])?;
    registry.register(Namespace::new(ns::ST_REF_PREFIX, ns::ST_REF), &["xmp"])?;
    Ok(())
}
