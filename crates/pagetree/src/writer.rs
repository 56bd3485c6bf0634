//! Streaming page writer
//!
//! Pages are appended in the order they are produced. Because a parent page
//! is only produced after all of its children were written, every reference
//! it carries is an offset that [`IndexWriter::write_page`] already returned.

use crate::constants::{MAX_CAPACITY, MAX_META_LEN, MIN_BUILD_CAPACITY};
use crate::error::{IndexError, IndexResult};
use crate::header::FileHeader;
use crate::page::{Page, page_len};
use std::io::{Seek, SeekFrom, Write};
use tracing::trace;

/// Writes the header placeholder, the pages and the final header
pub struct IndexWriter<W: Write + Seek> {
    writer: W,
    header: FileHeader,
    meta: Vec<u8>,
    capacity: usize,
    position: u64,
    page_count: u64,
}

impl<W: Write + Seek> IndexWriter<W> {
    /// Start a new index in `writer`, which must be empty
    ///
    /// Writes a placeholder header marked as building, followed by `meta`.
    /// A destination that already holds bytes is rejected with
    /// [`IndexError::DestinationNotEmpty`], since the writer never truncates.
    pub fn begin(mut writer: W, capacity: usize, meta: &[u8]) -> IndexResult<Self> {
        if meta.len() > MAX_META_LEN {
            return Err(IndexError::MetaTooLarge(meta.len()));
        }
        if !(MIN_BUILD_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(IndexError::InvalidConfig(format!(
                "capacity must be between {MIN_BUILD_CAPACITY} and {MAX_CAPACITY}, got {capacity}"
            )));
        }

        let existing = writer.seek(SeekFrom::End(0))?;
        if existing != 0 {
            return Err(IndexError::DestinationNotEmpty(existing));
        }

        let header = FileHeader::new_building(capacity as u32, meta.len() as u32);
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&header.to_bytes()?)?;
        writer.write_all(meta)?;

        let position = header.data_start();
        Ok(Self {
            writer,
            header,
            meta: meta.to_vec(),
            capacity,
            position,
            page_count: 0,
        })
    }

    /// Append a page and return its absolute offset
    pub fn write_page(&mut self, page: &Page) -> IndexResult<u64> {
        let bytes = page.encode(self.capacity)?;
        let offset = self.position;
        self.writer.write_all(&bytes)?;
        self.position += bytes.len() as u64;
        self.page_count += 1;

        trace!(
            offset,
            kind = ?page.kind(),
            slots = page.len(),
            "Wrote page"
        );
        Ok(offset)
    }

    /// Offset of the first page
    pub fn data_start(&self) -> u64 {
        self.header.data_start()
    }

    /// Pages written so far
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Backpatch the header and return it along with the inner writer
    ///
    /// `root_offset` must be the last page written, or the data start when
    /// no page was written.
    pub fn finish(
        mut self,
        root_offset: u64,
        entry_count: u64,
        depth: u32,
    ) -> IndexResult<(FileHeader, W)> {
        let expected_root = if self.page_count == 0 {
            self.data_start()
        } else {
            self.position - page_len(self.capacity) as u64
        };
        if root_offset != expected_root {
            return Err(IndexError::InvalidLayout(format!(
                "root offset {root_offset} is not the last page ({expected_root})"
            )));
        }

        self.header.finalize(
            root_offset,
            self.page_count,
            entry_count,
            depth,
            &self.meta,
        )?;

        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(&self.header.to_bytes()?)?;
        self.writer.seek(SeekFrom::Start(self.position))?;
        self.writer.flush()?;

        Ok((self.header, self.writer))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::header::BuildState;
    use crate::slot::{LeafSlot, Payload};
    use std::io::Cursor;

    fn leaf(key: u64) -> Page {
        Page::Leaf(vec![LeafSlot {
            key,
            payload: Payload::new(key, 0),
        }])
    }

    #[test]
    fn test_offsets_are_sequential() {
        let mut writer =
            IndexWriter::begin(Cursor::new(Vec::new()), 2, b"abc").expect("Operation should succeed");
        assert_eq!(writer.data_start(), 55);

        let first = writer.write_page(&leaf(1)).expect("Operation should succeed");
        let second = writer.write_page(&leaf(2)).expect("Operation should succeed");
        assert_eq!(first, 55);
        assert_eq!(second, 55 + page_len(2) as u64);
        assert_eq!(writer.page_count(), 2);

        let (header, cursor) = writer
            .finish(second, 2, 1)
            .expect("Operation should succeed");
        assert_eq!(header.build_state(), Some(BuildState::Complete));
        assert_eq!(header.root_offset, second);

        let bytes = cursor.into_inner();
        assert_eq!(bytes.len() as u64, second + page_len(2) as u64);
        assert_eq!(&bytes[52..55], b"abc");

        let parsed = FileHeader::parse(&bytes).expect("Operation should succeed");
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_unfinished_writer_leaves_placeholder() {
        let mut buffer = Vec::new();
        {
            let mut writer = IndexWriter::begin(Cursor::new(&mut buffer), 4, b"")
                .expect("Operation should succeed");
            writer.write_page(&leaf(9)).expect("Operation should succeed");
        }
        let header = FileHeader::parse(&buffer).expect("Operation should succeed");
        assert_eq!(header.build_state(), Some(BuildState::Building));
        assert!(matches!(header.validate(), Err(IndexError::IncompleteBuild)));
    }

    #[test]
    fn test_finish_requires_last_page_as_root() {
        let mut writer =
            IndexWriter::begin(Cursor::new(Vec::new()), 2, b"").expect("Operation should succeed");
        let first = writer.write_page(&leaf(1)).expect("Operation should succeed");
        writer.write_page(&leaf(2)).expect("Operation should succeed");
        assert!(matches!(
            writer.finish(first, 2, 1),
            Err(IndexError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_empty_index_root_is_data_start() {
        let writer =
            IndexWriter::begin(Cursor::new(Vec::new()), 16, b"").expect("Operation should succeed");
        let (header, cursor) = writer.finish(52, 0, 0).expect("Operation should succeed");
        assert_eq!(header.page_count, 0);
        assert_eq!(cursor.into_inner().len(), 52);
    }

    #[test]
    fn test_page_wider_than_capacity_is_rejected() {
        let mut writer =
            IndexWriter::begin(Cursor::new(Vec::new()), 2, b"").expect("Operation should succeed");
        let page = Page::Leaf(
            (1..=3)
                .map(|key| LeafSlot {
                    key,
                    payload: Payload::default(),
                })
                .collect(),
        );
        assert!(matches!(
            writer.write_page(&page),
            Err(IndexError::CapacityMismatch { .. })
        ));
    }

    #[test]
    fn test_capacity_below_build_minimum_is_rejected() {
        for capacity in [0, 1, MAX_CAPACITY + 1] {
            assert!(
                matches!(
                    IndexWriter::begin(Cursor::new(Vec::new()), capacity, b""),
                    Err(IndexError::InvalidConfig(_))
                ),
                "capacity {capacity}"
            );
        }
        assert!(IndexWriter::begin(Cursor::new(Vec::new()), MIN_BUILD_CAPACITY, b"").is_ok());
    }

    #[test]
    fn test_non_empty_destination_is_rejected() {
        let mut cursor = Cursor::new(vec![0xAA; 10]);
        cursor.set_position(0);
        assert!(matches!(
            IndexWriter::begin(&mut cursor, 4, b""),
            Err(IndexError::DestinationNotEmpty(10))
        ));
        // Existing bytes are left alone
        assert_eq!(cursor.into_inner(), vec![0xAA; 10]);

        // A destination positioned after a prefix counts as non-empty too
        let mut cursor = Cursor::new(b"prefix".to_vec());
        cursor.set_position(6);
        assert!(matches!(
            IndexWriter::begin(&mut cursor, 4, b""),
            Err(IndexError::DestinationNotEmpty(6))
        ));
        assert_eq!(cursor.into_inner(), b"prefix".to_vec());
    }
}
