//! Structural verification of an open index

use crate::error::{IndexError, IndexResult};
use crate::page::{Page, PageKind};
use crate::reader::{PageSource, PagedIndex};
use crate::slot::Key;
use std::collections::HashSet;
use tracing::debug;

/// Shape of a verified index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Number of levels
    pub depth: u32,
    /// Pages per level, leaf level first, as in [`crate::BuildSummary`]
    pub pages_per_level: Vec<usize>,
    /// Pages reached from the root
    pub page_count: u64,
    /// Leaf slots reached from the root
    pub entry_count: u64,
    /// Smallest indexed key
    pub min_key: Option<Key>,
    /// Largest indexed key
    pub max_key: Option<Key>,
}

impl<S: PageSource> PagedIndex<S> {
    /// Walk the whole tree level by level and check its structure
    ///
    /// Checks that keys increase strictly across every level, that every
    /// reference key equals the largest key of its child, that each level
    /// holds a single page kind with all leaves on the last level, that
    /// references point backwards to distinct pages, and that the header
    /// counts match what was reached.
    pub fn verify(&self) -> IndexResult<IndexReport> {
        let mut report = IndexReport {
            depth: 0,
            pages_per_level: Vec::new(),
            page_count: 0,
            entry_count: 0,
            min_key: None,
            max_key: None,
        };
        if self.is_empty() {
            return Ok(report);
        }

        let mut seen = HashSet::new();
        let mut level: Vec<(u64, Option<Key>)> = vec![(self.root_offset(), None)];

        loop {
            let depth = report.pages_per_level.len();
            if depth >= self.depth() as usize {
                return Err(IndexError::InvalidLayout(format!(
                    "tree is deeper than the recorded depth {}",
                    self.depth()
                )));
            }
            report.pages_per_level.push(level.len());

            let mut level_kind = None;
            let mut previous_key: Option<Key> = None;
            let mut next = Vec::new();

            for (offset, expected_max) in level {
                if !seen.insert(offset) {
                    return Err(IndexError::InvalidLayout(format!(
                        "page {offset} is referenced more than once"
                    )));
                }

                let page = self.read_page(offset)?;
                let kind = page.kind();
                if *level_kind.get_or_insert(kind) != kind {
                    return Err(IndexError::InvalidLayout(format!(
                        "level {depth} mixes leaf and reference pages"
                    )));
                }

                if let Some(expected) = expected_max
                    && page.max_key() != Some(expected)
                {
                    return Err(IndexError::InvalidLayout(format!(
                        "reference key {expected} does not match the largest key of page {offset}"
                    )));
                }

                if let (Some(previous), Some(first)) = (previous_key, page.min_key())
                    && first <= previous
                {
                    return Err(IndexError::InvalidLayout(format!(
                        "keys do not increase across level {depth} at page {offset}"
                    )));
                }
                previous_key = page.max_key();

                match page {
                    Page::Leaf(slots) => {
                        report.entry_count += slots.len() as u64;
                        if report.min_key.is_none() {
                            report.min_key = slots.first().map(|s| s.key);
                        }
                        report.max_key = slots.last().map(|s| s.key);
                    }
                    Page::Reference(slots) => {
                        for slot in slots {
                            next.push((self.child_offset(offset, slot.child)?, Some(slot.key)));
                        }
                    }
                }
            }

            debug!(level = depth, pages = report.pages_per_level[depth], "Verified level");
            if level_kind == Some(PageKind::Leaf) {
                break;
            }
            level = next;
        }

        report.depth = report.pages_per_level.len() as u32;
        report.page_count = seen.len() as u64;
        report.pages_per_level.reverse();

        if report.depth != self.depth() {
            return Err(IndexError::InvalidLayout(format!(
                "leaves found at depth {}, header records {}",
                report.depth,
                self.depth()
            )));
        }
        if report.page_count != self.page_count() {
            return Err(IndexError::InvalidLayout(format!(
                "{} pages reachable, header records {}",
                report.page_count,
                self.page_count()
            )));
        }
        if report.entry_count != self.entry_count() {
            return Err(IndexError::InvalidLayout(format!(
                "{} entries reachable, header records {}",
                report.entry_count,
                self.entry_count()
            )));
        }

        Ok(report)
    }
}
