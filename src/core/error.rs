//! Error types for XMP operations
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Error types for XMP operations
#[derive(Debug, Error)]
pub enum XmpError {
    /// Bad parameter provided to a function
    #[error("Bad parameter: {0}")]
    BadParam(String),

    /// Bad value provided (e.g., a value that does not parse into the field type)
    #[error("Bad value: {0}")]
    BadValue(String),

    /// A qualified name or path prefix maps to no registered namespace
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// A path segment could not be parsed
    #[error("Invalid path segment: {0}")]
    InvalidPathSegment(String),

    /// An array node on the wire has an unexpected shape
    #[error("Malformed array: {0}")]
    MalformedArray(String),

    /// The sync flags do not authorize the requested transition
    #[error("Unsupported flag combination: {0}")]
    UnsupportedFlags(String),

    /// Two fields of a record share a serialized name in overlapping versions
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    /// Parse error (XML/RDF parsing failed)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The serialized output exceeded its byte budget
    #[error("Size limit exceeded: {written} bytes written, limit is {limit}")]
    SizeLimitExceeded { written: usize, limit: usize },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Path or resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not supported
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl XmpError {
    /// Returns true for errors caused by malformed input syntax (paths, flags, XML).
    ///
    /// `SyncFlags::NOFAIL` never suppresses these.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            XmpError::InvalidPathSegment(_) | XmpError::ParseError(_) | XmpError::BadParam(_)
        )
    }

    pub(crate) fn path_not_found(path: impl std::fmt::Display) -> Self {
        XmpError::NotFound(format!("path {} not found", path))
    }
}

/// Result type alias for XMP operations
pub type XmpResult<T> = Result<T, XmpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XmpError::BadParam("test".to_string());
        assert!(err.to_string().contains("Bad parameter: test"));

        let err = XmpError::SizeLimitExceeded {
            written: 10,
            limit: 8,
        };
        assert_eq!(
            err.to_string(),
            "Size limit exceeded: 10 bytes written, limit is 8"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let xmp_err: XmpError = io_err.into();
        assert!(matches!(xmp_err, XmpError::IoError(_)));
    }

    #[test]
    fn test_parse_error_classification() {
        assert!(XmpError::InvalidPathSegment("x[-2]".into()).is_parse_error());
        assert!(!XmpError::UnsupportedFlags("create".into()).is_parse_error());
        assert!(!XmpError::path_not_found("dc:title").is_parse_error());
        assert_eq!(
            XmpError::path_not_found("dc:title").to_string(),
            "Not found: path dc:title not found"
        );
    }
}
