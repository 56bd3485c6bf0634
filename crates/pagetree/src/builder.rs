//! Bottom-up index builder
//!
//! The builder sorts the entries, packs them into leaf pages of at most
//! `capacity` slots, then indexes the `(max key, page offset)` pairs of each
//! level with reference pages until a single page remains. That page is the
//! root and is always the last page of the file.

use crate::config::BuildConfig;
use crate::error::{IndexError, IndexResult};
use crate::page::Page;
use crate::slot::{Key, LeafSlot, Payload, RefSlot};
use crate::writer::IndexWriter;
use std::collections::BTreeMap;
use std::io::{Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Absolute offset of the root page
    pub root_offset: u64,
    /// Total pages written
    pub page_count: u64,
    /// Number of distinct keys indexed
    pub entry_count: u64,
    /// Number of levels (0 for an empty index)
    pub depth: u32,
    /// Pages per level, leaf level first
    pub pages_per_level: Vec<usize>,
}

/// Collects entries and writes them as a paged index
///
/// Keys are kept in an ordered map. Adding a key that is already present
/// replaces its payload, so the last value added for a key wins.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    config: BuildConfig,
    entries: BTreeMap<Key, Payload>,
    meta: Vec<u8>,
}

impl IndexBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with the given configuration
    pub fn with_config(config: BuildConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Attach opaque meta-data stored after the file header
    pub fn with_meta(mut self, meta: impl Into<Vec<u8>>) -> Self {
        self.meta = meta.into();
        self
    }

    /// Add an entry, replacing any payload already stored for `key`
    pub fn add_entry(&mut self, key: Key, payload: impl Into<Payload>) -> &mut Self {
        let payload = payload.into();
        if let Some(previous) = self.entries.insert(key, payload) {
            debug!(
                key,
                ?previous,
                ?payload,
                "Duplicate key, keeping the last payload"
            );
        }
        self
    }

    /// Add every entry of `entries`
    pub fn extend<I, P>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (Key, P)>,
        P: Into<Payload>,
    {
        for (key, payload) in entries {
            self.add_entry(key, payload);
        }
        self
    }

    /// Build configuration
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Get current number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if builder is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the index to `writer`, starting at offset 0
    ///
    /// `writer` must be empty. Nothing is truncated, so a destination that
    /// already holds bytes fails with [`IndexError::DestinationNotEmpty`].
    pub fn build<W: Write + Seek>(self, writer: W) -> IndexResult<BuildSummary> {
        self.config.validate()?;
        let capacity = self.config.capacity;
        let entry_count = self.entries.len() as u64;

        let mut out = IndexWriter::begin(writer, capacity, &self.meta)?;
        let mut pages_per_level = Vec::new();

        let leaves: Vec<LeafSlot> = self
            .entries
            .into_iter()
            .map(|(key, payload)| LeafSlot { key, payload })
            .collect();

        let mut level = write_level(&mut out, &leaves, capacity, |s| s.key, Page::Leaf)?;
        if !level.is_empty() {
            pages_per_level.push(level.len());
            debug!(pages = level.len(), "Wrote leaf level");
        }

        while level.len() > 1 {
            level = write_level(&mut out, &level, capacity, |s| s.key, Page::Reference)?;
            pages_per_level.push(level.len());
            debug!(
                level = pages_per_level.len() - 1,
                pages = level.len(),
                "Wrote reference level"
            );
        }

        let root_offset = level.first().map_or_else(|| out.data_start(), |s| s.child);
        let depth = pages_per_level.len() as u32;
        let page_count = out.page_count();
        out.finish(root_offset, entry_count, depth)?;

        info!(
            entries = entry_count,
            pages = page_count,
            depth,
            root_offset,
            "Built paged index"
        );

        Ok(BuildSummary {
            root_offset,
            page_count,
            entry_count,
            depth,
            pages_per_level,
        })
    }
}

/// Write one level of pages and return the slots indexing it
fn write_level<W, T>(
    out: &mut IndexWriter<W>,
    slots: &[T],
    capacity: usize,
    key_of: impl Fn(&T) -> Key,
    make_page: impl Fn(Vec<T>) -> Page,
) -> IndexResult<Vec<RefSlot>>
where
    W: Write + Seek,
    T: Clone,
{
    let mut parents = Vec::with_capacity(slots.len().div_ceil(capacity));
    for chunk in slots.chunks(capacity) {
        let Some(last) = chunk.last() else {
            continue;
        };
        let key = key_of(last);
        let child = out.write_page(&make_page(chunk.to_vec()))?;
        parents.push(RefSlot { key, child });
    }
    Ok(parents)
}

/// Build an index into an open, empty writer with the default configuration
pub fn build_index<W, I, P>(writer: W, entries: I, meta: &[u8]) -> IndexResult<BuildSummary>
where
    W: Write + Seek,
    I: IntoIterator<Item = (Key, P)>,
    P: Into<Payload>,
{
    build_index_with_config(writer, entries, meta, &BuildConfig::default())
}

/// Build an index into an open, empty writer
pub fn build_index_with_config<W, I, P>(
    writer: W,
    entries: I,
    meta: &[u8],
    config: &BuildConfig,
) -> IndexResult<BuildSummary>
where
    W: Write + Seek,
    I: IntoIterator<Item = (Key, P)>,
    P: Into<Payload>,
{
    let mut builder = IndexBuilder::with_config(config.clone()).with_meta(meta);
    builder.extend(entries);
    builder.build(writer)
}

/// Build an index file at `path` with the default configuration
pub fn build_index_file<Q, I, P>(path: Q, entries: I, meta: &[u8]) -> IndexResult<BuildSummary>
where
    Q: AsRef<Path>,
    I: IntoIterator<Item = (Key, P)>,
    P: Into<Payload>,
{
    build_index_file_with_config(path, entries, meta, &BuildConfig::default())
}

/// Build an index file at `path`
///
/// The index is written to a temporary file next to `path` and renamed into
/// place once complete, so a failed build never leaves a file at `path`.
pub fn build_index_file_with_config<Q, I, P>(
    path: Q,
    entries: I,
    meta: &[u8],
    config: &BuildConfig,
) -> IndexResult<BuildSummary>
where
    Q: AsRef<Path>,
    I: IntoIterator<Item = (Key, P)>,
    P: Into<Payload>,
{
    let path = path.as_ref();
    config.validate()?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;

    let summary = build_index_with_config(temp.as_file_mut(), entries, meta, config)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| IndexError::Io(e.error))?;

    info!(path = %path.display(), "Persisted index file");
    Ok(summary)
}
