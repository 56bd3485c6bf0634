//! Error types for index building and querying

use thiserror::Error;

/// Index operation result type
pub type IndexResult<T> = Result<T, IndexError>;

/// Error types for building, opening and traversing a paged index
///
/// A search miss is not an error: lookups return `Ok(None)` and range scans
/// with no qualifying keys return an empty vector.
#[derive(Debug, Error)]
pub enum IndexError {
    /// File does not start with the index magic
    #[error("Invalid index magic: expected \"PGIX\", got {0:02x?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported format version
    #[error("Unsupported index version: {0}")]
    UnsupportedVersion(u16),

    /// Header was never finalized (the build did not complete)
    #[error("Index file is incomplete: build did not finish")]
    IncompleteBuild,

    /// Header checksum mismatch
    #[error("Header checksum mismatch: expected {expected:02x?}, got {actual:02x?}")]
    HeaderChecksum {
        /// Checksum computed from the header fields and meta-data
        expected: [u8; 8],
        /// Checksum stored in the file
        actual: [u8; 8],
    },

    /// Page capacity is zero or absurdly large
    #[error("Invalid page capacity: {0}")]
    InvalidCapacity(u32),

    /// Root offset does not point at the last page of the file
    #[error("Root offset {root_offset} outside of file extent ({file_len} bytes)")]
    RootOutOfBounds {
        /// Root offset recorded in the header
        root_offset: u64,
        /// Size of the file in bytes
        file_len: u64,
    },

    /// File layout disagrees with the header
    #[error("Invalid index layout: {0}")]
    InvalidLayout(String),

    /// Unrecognised page tag
    #[error("Invalid page tag: {0}")]
    InvalidPageTag(u8),

    /// Page buffer shorter than the encoded page length
    #[error("Truncated page: expected {expected} bytes, got {actual}")]
    TruncatedPage {
        /// Encoded page length for the index capacity
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Page does not fit the declared capacity
    #[error("Page capacity mismatch: capacity {capacity}, page holds {actual} slots")]
    CapacityMismatch {
        /// Declared page capacity
        capacity: usize,
        /// Slot count found in the page
        actual: usize,
    },

    /// Slot keys inside a page are not strictly increasing
    #[error("Page slots are not strictly increasing by key")]
    UnsortedSlots,

    /// Page content is malformed
    #[error("Invalid page: {0}")]
    InvalidPage(String),

    /// A reference slot points at or after its own page
    #[error("Forward reference from page {page} to child {child}")]
    ForwardReference {
        /// Offset of the referencing page
        page: u64,
        /// Offset of the referenced child
        child: u64,
    },

    /// Page offset outside the page region of the file
    #[error("Page offset {offset} out of range (page region {start}..{end})")]
    PageOutOfRange {
        /// Requested offset
        offset: u64,
        /// First byte of the page region
        start: u64,
        /// End of the page region
        end: u64,
    },

    /// Invalid build configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Build destination already holds data
    #[error("Build destination is not empty: {0} bytes already present")]
    DestinationNotEmpty(u64),

    /// Meta-data does not fit the header
    #[error("Meta-data too large: {0} bytes")]
    MetaTooLarge(usize),

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Check if this error reports a malformed file
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic(_)
                | Self::UnsupportedVersion(_)
                | Self::IncompleteBuild
                | Self::HeaderChecksum { .. }
                | Self::InvalidCapacity(_)
                | Self::RootOutOfBounds { .. }
                | Self::InvalidLayout(_)
                | Self::InvalidPageTag(_)
                | Self::TruncatedPage { .. }
                | Self::CapacityMismatch { .. }
                | Self::UnsortedSlots
                | Self::InvalidPage(_)
                | Self::ForwardReference { .. }
        ) || matches!(self, Self::BinRw(e) if !matches!(e, binrw::Error::Io(_)))
    }

    /// Check if this error comes from the underlying I/O resource
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::PageOutOfRange { .. } | Self::BinRw(binrw::Error::Io(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(IndexError::InvalidMagic(*b"NOPE").is_format_error());
        assert!(IndexError::IncompleteBuild.is_format_error());
        assert!(!IndexError::IncompleteBuild.is_io_error());

        let io = IndexError::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(io.is_io_error());
        assert!(!io.is_format_error());

        let out_of_range = IndexError::PageOutOfRange {
            offset: 4,
            start: 52,
            end: 500,
        };
        assert!(out_of_range.is_io_error());

        assert!(!IndexError::InvalidConfig("capacity".into()).is_format_error());
        assert!(!IndexError::DestinationNotEmpty(3188).is_format_error());
        assert!(!IndexError::DestinationNotEmpty(3188).is_io_error());
    }

    #[test]
    fn test_error_messages() {
        let err = IndexError::TruncatedPage {
            expected: 392,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "Truncated page: expected 392 bytes, got 10"
        );
        assert_eq!(
            IndexError::InvalidCapacity(0).to_string(),
            "Invalid page capacity: 0"
        );
    }
}
