//! Value utilities

pub mod datetime;
pub mod version;

pub use datetime::XmpDateTime;
pub use version::Version;
