//! Parse and serialize options
//!
//! Both option types are small `Copy` builders:
//!
//! ```
//! use xmpdoc::{SerializeOptions, Version};
//!
//! let opts = SerializeOptions::default()
//!     .compact()
//!     .pad_to(4096)
//!     .version(Version::new(1, 0, 0));
//! assert!(opts.compact && opts.pad_to == 4096);
//! ```

use crate::utils::version::Version;

/// Options for decoding a packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Schema version used to select versioned fields, zero for all
    pub version: Version,
    /// Fail on namespaces that are neither declared nor registered
    pub strict: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// Options for writing a packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Omit the `<?xpacket?>` header and trailer
    pub omit_packet: bool,
    /// Omit the `x:xmptk` toolkit attribute
    pub omit_toolkit: bool,
    /// Write without indentation or newlines
    pub compact: bool,
    /// Pad the packet with whitespace up to this many bytes, 0 for none
    pub pad_to: usize,
    /// Abort once more than this many bytes were written
    pub max_size: Option<usize>,
    /// Schema version used to select versioned fields, zero for all
    pub version: Version,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn omit_packet(mut self) -> Self {
        self.omit_packet = true;
        self
    }

    pub fn omit_toolkit(mut self) -> Self {
        self.omit_toolkit = true;
        self
    }

    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    pub fn pad_to(mut self, size: usize) -> Self {
        self.pad_to = size;
        self
    }

    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}
