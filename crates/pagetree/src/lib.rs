//! Immutable, disk-resident paged tree index for `u64` keys
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format encoding
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate builds a compact paged file from an in-memory key to payload
//! mapping once, then answers point lookups and ordered range scans against
//! that file using only positioned reads. The whole structure is never
//! loaded into memory, so an index over tens of millions of rows can be
//! queried from a process with a few kilobytes of working set.
//!
//! # File Layout
//!
//! ```text
//! Paged index file:
//! ├── Header (52 bytes, little-endian)
//! │   ├── magic "PGIX", version, state, capacity
//! │   ├── page_count, entry_count, depth
//! │   ├── meta_len, root_offset
//! │   └── checksum (MD5 of header + meta, first 8 bytes)
//! ├── Meta-data (meta_len opaque bytes)
//! └── Pages (8 + 24 × capacity bytes each)
//!     ├── Leaf pages, ascending by key
//!     ├── Level-1 reference pages
//!     ├── ...
//!     └── Root page (always last)
//! ```
//!
//! Pages are written bottom-up, so every reference slot points backwards
//! to a page that was already on disk when its parent was produced.
//!
//! # Usage Examples
//!
//! ## Build and Query
//!
//! ```rust
//! use pagetree::{Payload, build_index, open_index_reader};
//! use std::io::Cursor;
//!
//! let entries = [(10u64, (100u64, 1u64)), (20, (200, 2)), (30, (300, 3))];
//!
//! let mut file = Cursor::new(Vec::new());
//! build_index(&mut file, entries, b"prices by postcode")?;
//!
//! let index = open_index_reader(file)?;
//! assert_eq!(index.search(20)?, Some(Payload::new(200, 2)));
//! assert_eq!(index.search(25)?, None);
//! assert_eq!(index.get(25, Payload::default())?, Payload::default());
//!
//! let hits = index.range(15, 30)?;
//! assert_eq!(hits, vec![(20, Payload::new(200, 2)), (30, Payload::new(300, 3))]);
//! # Ok::<(), pagetree::IndexError>(())
//! ```
//!
//! ## Build to a File
//!
//! ```rust,no_run
//! use pagetree::{BuildConfig, build_index_file_with_config, open_index};
//! use std::collections::HashMap;
//!
//! let mut rows: HashMap<u64, (u64, u64)> = HashMap::new();
//! rows.insert(42, (63_000, 2000));
//!
//! let config = BuildConfig::default().with_capacity(64);
//! build_index_file_with_config("prices.idx", rows, b"", &config)?;
//!
//! let index = open_index("prices.idx")?;
//! println!("{:?}", index.search(42)?);
//! # Ok::<(), pagetree::IndexError>(())
//! ```

#![warn(missing_docs)]

mod builder;
mod config;
/// GraphViz export of the page tree for debugging
pub mod dot;
mod error;
mod header;
mod page;
mod range;
mod reader;
mod search;
mod slot;
mod verify;
mod writer;

pub use builder::{
    BuildSummary, IndexBuilder, build_index, build_index_file, build_index_file_with_config,
    build_index_with_config,
};
pub use config::BuildConfig;
pub use error::{IndexError, IndexResult};
pub use header::{BuildState, FileHeader};
pub use page::{Page, PageKind, page_len};
pub use range::RangeIter;
pub use reader::{PageSource, PagedIndex, SeekSource, open_index, open_index_reader};
pub use slot::{Key, LeafSlot, Payload, RefSlot};
pub use verify::IndexReport;
pub use writer::IndexWriter;

/// Paged index format constants
pub mod constants {
    /// Magic bytes at the start of every index file
    pub const MAGIC: [u8; 4] = *b"PGIX";

    /// Current on-disk format version
    pub const FORMAT_VERSION: u16 = 1;

    /// Default number of slots per page
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Smallest capacity a build accepts
    ///
    /// With one slot per page every level has as many pages as the level
    /// below it, so the tree never narrows to a single root.
    pub const MIN_BUILD_CAPACITY: usize = 2;

    /// Largest capacity accepted when building or opening an index
    pub const MAX_CAPACITY: usize = 65_536;

    /// Size of the fixed file header in bytes
    pub const FIXED_HEADER_SIZE: usize = 52;

    /// Size of the per-page header (tag, reserved, live slot count)
    pub const PAGE_HEADER_SIZE: usize = 8;

    /// Size of one encoded slot (key + two 64-bit words)
    pub const SLOT_SIZE: usize = 24;

    /// Key written into unused trailing slots of an under-full page
    pub const PADDING_KEY: u64 = u64::MAX;

    /// Largest meta-data blob stored in the header (16 MiB)
    pub const MAX_META_LEN: usize = 16 * 1024 * 1024;
}
