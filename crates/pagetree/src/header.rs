//! Fixed file header
//!
//! The header is written twice: once as a placeholder before any page is
//! produced (state `Building`) and once more after the root page is on disk,
//! when the root offset, counts and checksum are known (state `Complete`).
//! A file whose build was interrupted keeps the placeholder and is rejected
//! on open.

use crate::constants::{FIXED_HEADER_SIZE, FORMAT_VERSION, MAGIC, MAX_CAPACITY};
use crate::error::{IndexError, IndexResult};
use crate::page::page_len;
use binrw::{BinRead, BinWrite};
use md5::{Digest, Md5};
use std::io::Cursor;

/// Build progress recorded in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Placeholder header; pages may be missing
    Building,
    /// Header rewritten after the last page was written
    Complete,
}

impl BuildState {
    /// Decode the on-disk state byte
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Building),
            1 => Some(Self::Complete),
            _ => None,
        }
    }

    /// On-disk state byte
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Building => 0,
            Self::Complete => 1,
        }
    }
}

/// Index file header (52 bytes, little-endian)
///
/// ```text
/// offset 0x00: [u8; 4] magic        "PGIX"
/// offset 0x04: u16     version      (1)
/// offset 0x06: u8      state        (0 building, 1 complete)
/// offset 0x07: u8      reserved
/// offset 0x08: u32     capacity     (slots per page)
/// offset 0x0C: u64     page_count
/// offset 0x14: u64     entry_count
/// offset 0x1C: u32     depth        (levels, 0 when empty)
/// offset 0x20: u32     meta_len
/// offset 0x24: u64     root_offset
/// offset 0x2C: [u8; 8] checksum     (MD5 of header + meta, first 8 bytes)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct FileHeader {
    /// Magic bytes "PGIX"
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Build state byte, see [`BuildState`]
    pub state: u8,
    /// Reserved (zero)
    pub reserved: u8,
    /// Slots per page
    pub capacity: u32,
    /// Total number of pages
    pub page_count: u64,
    /// Total number of leaf slots
    pub entry_count: u64,
    /// Number of levels; every leaf sits at this depth
    pub depth: u32,
    /// Length of the meta-data block following the header
    pub meta_len: u32,
    /// Absolute offset of the root page
    pub root_offset: u64,
    /// First 8 bytes of the MD5 over the header (checksum zeroed) and meta-data
    pub checksum: [u8; 8],
}

impl FileHeader {
    /// Create a placeholder header for a build that is about to start
    pub fn new_building(capacity: u32, meta_len: u32) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            state: BuildState::Building.as_byte(),
            reserved: 0,
            capacity,
            page_count: 0,
            entry_count: 0,
            depth: 0,
            meta_len,
            root_offset: 0,
            checksum: [0; 8],
        }
    }

    /// Mark the header complete and seal it with a checksum over `meta`
    pub fn finalize(
        &mut self,
        root_offset: u64,
        page_count: u64,
        entry_count: u64,
        depth: u32,
        meta: &[u8],
    ) -> IndexResult<()> {
        self.state = BuildState::Complete.as_byte();
        self.root_offset = root_offset;
        self.page_count = page_count;
        self.entry_count = entry_count;
        self.depth = depth;
        self.checksum = self.calculate_checksum(meta)?;
        Ok(())
    }

    /// Parse the fixed header from the first [`FIXED_HEADER_SIZE`] bytes
    pub fn parse(data: &[u8]) -> IndexResult<Self> {
        if data.len() < FIXED_HEADER_SIZE {
            return Err(IndexError::InvalidLayout(format!(
                "file too short for header: {} bytes",
                data.len()
            )));
        }
        Ok(Self::read(&mut Cursor::new(&data[..FIXED_HEADER_SIZE]))?)
    }

    /// Serialize the header
    pub fn to_bytes(&self) -> IndexResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(FIXED_HEADER_SIZE));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Calculate the checksum over the header fields and meta-data
    pub fn calculate_checksum(&self, meta: &[u8]) -> IndexResult<[u8; 8]> {
        let mut unsealed = self.clone();
        unsealed.checksum = [0; 8];

        let mut hasher = Md5::new();
        hasher.update(unsealed.to_bytes()?);
        hasher.update(meta);
        let result = hasher.finalize();

        let mut checksum = [0u8; 8];
        checksum.copy_from_slice(&result[..8]);
        Ok(checksum)
    }

    /// Validate the fields that do not depend on the file size
    pub fn validate(&self) -> IndexResult<()> {
        if self.magic != MAGIC {
            return Err(IndexError::InvalidMagic(self.magic));
        }

        if self.version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(self.version));
        }

        match self.build_state() {
            Some(BuildState::Complete) => {}
            Some(BuildState::Building) => return Err(IndexError::IncompleteBuild),
            None => {
                return Err(IndexError::InvalidLayout(format!(
                    "unknown build state {}",
                    self.state
                )));
            }
        }

        if self.capacity == 0 || self.capacity as usize > MAX_CAPACITY {
            return Err(IndexError::InvalidCapacity(self.capacity));
        }

        let empty = self.page_count == 0;
        if empty != (self.entry_count == 0) || empty != (self.depth == 0) {
            return Err(IndexError::InvalidLayout(format!(
                "inconsistent counts: {} pages, {} entries, depth {}",
                self.page_count, self.entry_count, self.depth
            )));
        }

        Ok(())
    }

    /// Verify the stored checksum against `meta`
    pub fn verify_checksum(&self, meta: &[u8]) -> IndexResult<()> {
        let expected = self.calculate_checksum(meta)?;
        if expected != self.checksum {
            return Err(IndexError::HeaderChecksum {
                expected,
                actual: self.checksum,
            });
        }
        Ok(())
    }

    /// Decoded build state, `None` for an unknown state byte
    pub fn build_state(&self) -> Option<BuildState> {
        BuildState::from_byte(self.state)
    }

    /// Offset of the first page
    pub fn data_start(&self) -> u64 {
        FIXED_HEADER_SIZE as u64 + u64::from(self.meta_len)
    }

    /// Encoded length of every page in the file
    pub fn page_len(&self) -> u64 {
        page_len(self.capacity as usize) as u64
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sealed(meta: &[u8]) -> FileHeader {
        let mut header = FileHeader::new_building(16, meta.len() as u32);
        header
            .finalize(52 + meta.len() as u64, 1, 3, 1, meta)
            .expect("Operation should succeed");
        header
    }

    #[test]
    fn test_header_size() {
        let bytes = FileHeader::new_building(16, 0)
            .to_bytes()
            .expect("Operation should succeed");
        assert_eq!(bytes.len(), FIXED_HEADER_SIZE);
        assert_eq!(&bytes[..4], b"PGIX");
    }

    #[test]
    fn test_header_round_trip() {
        let header = sealed(b"meta");
        let bytes = header.to_bytes().expect("Operation should succeed");
        let parsed = FileHeader::parse(&bytes).expect("Operation should succeed");
        assert_eq!(parsed, header);
        assert!(parsed.validate().is_ok());
        assert!(parsed.verify_checksum(b"meta").is_ok());
        assert_eq!(parsed.data_start(), 56);
        assert_eq!(parsed.page_len(), 8 + 16 * 24);
    }

    #[test]
    fn test_placeholder_is_rejected() {
        let header = FileHeader::new_building(16, 0);
        assert!(matches!(
            header.validate(),
            Err(IndexError::IncompleteBuild)
        ));
    }

    #[test]
    fn test_checksum_covers_meta() {
        let header = sealed(b"alpha");
        assert!(matches!(
            header.verify_checksum(b"alphb"),
            Err(IndexError::HeaderChecksum { .. })
        ));

        let mut tampered = header;
        tampered.root_offset += 1;
        assert!(tampered.verify_checksum(b"alpha").is_err());
    }

    #[test]
    fn test_validate_fields() {
        let mut header = sealed(b"");
        header.magic = *b"NOPE";
        assert!(matches!(
            header.validate(),
            Err(IndexError::InvalidMagic(m)) if &m == b"NOPE"
        ));

        let mut header = sealed(b"");
        header.version = 7;
        assert!(matches!(
            header.validate(),
            Err(IndexError::UnsupportedVersion(7))
        ));

        let mut header = sealed(b"");
        header.capacity = 0;
        assert!(matches!(
            header.validate(),
            Err(IndexError::InvalidCapacity(0))
        ));

        let mut header = sealed(b"");
        header.capacity = u32::MAX;
        assert!(matches!(
            header.validate(),
            Err(IndexError::InvalidCapacity(_))
        ));

        let mut header = sealed(b"");
        header.depth = 0;
        assert!(matches!(
            header.validate(),
            Err(IndexError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_parse_short_input() {
        assert!(matches!(
            FileHeader::parse(&[0u8; 10]),
            Err(IndexError::InvalidLayout(_))
        ));
    }
}
