//! Opening and validating index files
//!
//! A [`PagedIndex`] keeps only the header and meta-data in memory. Pages are
//! fetched on demand through a [`PageSource`], which performs positioned
//! reads so concurrent queries never share a file cursor.

use crate::constants::FIXED_HEADER_SIZE;
use crate::error::{IndexError, IndexResult};
use crate::header::FileHeader;
use crate::page::Page;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{info, trace};

/// Random-access byte source backing an open index
pub trait PageSource {
    /// Total length of the source in bytes
    fn size(&self) -> io::Result<u64>;

    /// Fill `buf` with the bytes starting at `offset`
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] on a short read.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

impl PageSource for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        while !buf.is_empty() {
            match self.seek_read(buf, offset) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                Ok(n) => {
                    buf = &mut buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let mut file = self;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

impl PageSource for Vec<u8> {
    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let bytes = start
            .checked_add(buf.len())
            .and_then(|end| self.get(start..end))
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(bytes);
        Ok(())
    }
}

/// Adapts any seekable reader into a [`PageSource`]
///
/// The reader's cursor is shared state, so every positioned read holds a
/// lock across the seek and the read.
pub struct SeekSource<R> {
    inner: Mutex<R>,
    len: u64,
}

impl<R: Read + Seek> SeekSource<R> {
    /// Wrap `reader`, measuring its length once
    pub fn new(mut reader: R) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            inner: Mutex::new(reader),
            len,
        })
    }

    /// Unwrap the inner reader
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read + Seek> PageSource for SeekSource<R> {
    fn size(&self) -> io::Result<u64> {
        Ok(self.len)
    }

    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let mut reader = self.inner.lock();
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(buf)
    }
}

/// Read-only handle over a built index
///
/// Holds the validated header and meta-data; pages are read on demand.
/// The handle is `Send + Sync` whenever its source is, so one handle can
/// serve queries from many threads.
pub struct PagedIndex<S: PageSource = File> {
    source: S,
    header: FileHeader,
    meta: Vec<u8>,
}

impl<S: PageSource> PagedIndex<S> {
    /// Open an index over `source`, validating header and layout
    pub fn open(source: S) -> IndexResult<Self> {
        let file_len = source.size()?;
        if file_len < FIXED_HEADER_SIZE as u64 {
            return Err(IndexError::InvalidLayout(format!(
                "file too short for header: {file_len} bytes"
            )));
        }

        let mut header_bytes = [0u8; FIXED_HEADER_SIZE];
        source.read_exact_at(&mut header_bytes, 0)?;
        let header = FileHeader::parse(&header_bytes)?;
        header.validate()?;

        let data_start = header.data_start();
        if data_start > file_len {
            return Err(IndexError::InvalidLayout(format!(
                "meta-data ({} bytes) extends past end of file",
                header.meta_len
            )));
        }

        let mut meta = vec![0u8; header.meta_len as usize];
        source.read_exact_at(&mut meta, FIXED_HEADER_SIZE as u64)?;
        header.verify_checksum(&meta)?;

        let page_len = header.page_len();
        let expected_len = header
            .page_count
            .checked_mul(page_len)
            .and_then(|pages| pages.checked_add(data_start))
            .ok_or_else(|| {
                IndexError::InvalidLayout(format!(
                    "page count {} overflows the file extent",
                    header.page_count
                ))
            })?;
        if expected_len != file_len {
            return Err(IndexError::InvalidLayout(format!(
                "expected {expected_len} bytes for {} pages, file has {file_len}",
                header.page_count
            )));
        }

        let expected_root = if header.page_count == 0 {
            data_start
        } else {
            if header.root_offset > file_len - page_len {
                return Err(IndexError::RootOutOfBounds {
                    root_offset: header.root_offset,
                    file_len,
                });
            }
            file_len - page_len
        };
        if header.root_offset != expected_root {
            return Err(IndexError::InvalidLayout(format!(
                "root offset {} is not the last page ({expected_root})",
                header.root_offset
            )));
        }

        info!(
            capacity = header.capacity,
            pages = header.page_count,
            entries = header.entry_count,
            depth = header.depth,
            "Opened paged index"
        );

        Ok(Self {
            source,
            header,
            meta,
        })
    }

    /// Read and decode the page at `offset`
    pub fn read_page(&self, offset: u64) -> IndexResult<Page> {
        let start = self.data_start();
        let page_len = self.page_len();
        let end = start + self.header.page_count * page_len;
        if offset < start || offset >= end || (offset - start) % page_len != 0 {
            return Err(IndexError::PageOutOfRange { offset, start, end });
        }

        let mut buf = vec![0u8; page_len as usize];
        self.source.read_exact_at(&mut buf, offset)?;
        let page = Page::decode(&buf, self.capacity())?;

        trace!(offset, kind = ?page.kind(), slots = page.len(), "Read page");
        Ok(page)
    }

    /// Check that a reference from the page at `page` points backwards
    pub(crate) fn child_offset(&self, page: u64, child: u64) -> IndexResult<u64> {
        if child >= page {
            return Err(IndexError::ForwardReference { page, child });
        }
        Ok(child)
    }

    /// Validated file header
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Opaque meta-data stored with the index
    pub fn meta(&self) -> &[u8] {
        &self.meta
    }

    /// Meta-data decoded as newline separated text
    pub fn meta_lines(&self) -> Vec<String> {
        if self.meta.is_empty() {
            return Vec::new();
        }
        String::from_utf8_lossy(&self.meta)
            .split('\n')
            .map(String::from)
            .collect()
    }

    /// Slots per page
    pub fn capacity(&self) -> usize {
        self.header.capacity as usize
    }

    /// Absolute offset of the root page
    pub fn root_offset(&self) -> u64 {
        self.header.root_offset
    }

    /// Total number of pages
    pub fn page_count(&self) -> u64 {
        self.header.page_count
    }

    /// Total number of indexed keys
    pub fn entry_count(&self) -> u64 {
        self.header.entry_count
    }

    /// Number of levels in the tree
    pub fn depth(&self) -> u32 {
        self.header.depth
    }

    /// Check if the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.header.page_count == 0
    }

    /// Encoded length of every page
    pub fn page_len(&self) -> u64 {
        self.header.page_len()
    }

    /// Offset of the first page
    pub fn data_start(&self) -> u64 {
        self.header.data_start()
    }

    /// Release the handle and return its source
    pub fn into_source(self) -> S {
        self.source
    }
}

/// Open the index file at `path`
pub fn open_index(path: impl AsRef<Path>) -> IndexResult<PagedIndex<File>> {
    let file = File::open(path.as_ref())?;
    PagedIndex::open(file)
}

/// Open an index from an already-open seekable reader
pub fn open_index_reader<R: Read + Seek>(reader: R) -> IndexResult<PagedIndex<SeekSource<R>>> {
    PagedIndex::open(SeekSource::new(reader)?)
}
