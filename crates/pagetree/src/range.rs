//! Ordered range scans
//!
//! A scan is a depth-first walk over an explicit stack of page offsets.
//! Reference pages push only the children whose key interval can overlap
//! `[min, max]`, so a scan touches `O(depth + k / capacity)` pages.

use crate::error::IndexResult;
use crate::page::Page;
use crate::reader::{PageSource, PagedIndex};
use crate::slot::{Key, Payload};
use std::collections::VecDeque;
use std::iter::FusedIterator;

/// Lazy iterator over the entries of a key range, in ascending key order
///
/// Yields an error and stops if a page cannot be read.
pub struct RangeIter<'a, S: PageSource> {
    index: &'a PagedIndex<S>,
    min: Key,
    max: Key,
    stack: Vec<u64>,
    pending: VecDeque<(Key, Payload)>,
}

impl<'a, S: PageSource> RangeIter<'a, S> {
    fn new(index: &'a PagedIndex<S>, min: Key, max: Key) -> Self {
        let mut stack = Vec::new();
        if min <= max && !index.is_empty() {
            stack.push(index.root_offset());
        }
        Self {
            index,
            min,
            max,
            stack,
            pending: VecDeque::new(),
        }
    }

    fn expand(&mut self, offset: u64) -> IndexResult<()> {
        match self.index.read_page(offset)? {
            Page::Leaf(slots) => {
                let start = slots.partition_point(|s| s.key < self.min);
                self.pending.extend(
                    slots[start..]
                        .iter()
                        .take_while(|s| s.key <= self.max)
                        .map(|s| (s.key, s.payload)),
                );
            }
            Page::Reference(slots) => {
                // children left of `start` hold only keys below `min`; the
                // first child whose key reaches `max` is the last one needed
                let start = slots.partition_point(|s| s.key < self.min);
                let mut children = Vec::new();
                for slot in &slots[start..] {
                    children.push(self.index.child_offset(offset, slot.child)?);
                    if slot.key >= self.max {
                        break;
                    }
                }
                self.stack.extend(children.into_iter().rev());
            }
        }
        Ok(())
    }
}

impl<S: PageSource> Iterator for RangeIter<'_, S> {
    type Item = IndexResult<(Key, Payload)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(entry));
            }
            let offset = self.stack.pop()?;
            if let Err(e) = self.expand(offset) {
                self.stack.clear();
                return Some(Err(e));
            }
        }
    }
}

impl<S: PageSource> FusedIterator for RangeIter<'_, S> {}

impl<S: PageSource> PagedIndex<S> {
    /// Collect every entry with `min <= key <= max`, ascending by key
    ///
    /// An inverted range (`min > max`) is empty rather than an error.
    pub fn range(&self, min: Key, max: Key) -> IndexResult<Vec<(Key, Payload)>> {
        self.range_iter(min, max).collect()
    }

    /// Lazily iterate the entries with `min <= key <= max`
    pub fn range_iter(&self, min: Key, max: Key) -> RangeIter<'_, S> {
        RangeIter::new(self, min, max)
    }

    /// Iterate every entry in key order
    pub fn iter(&self) -> RangeIter<'_, S> {
        self.range_iter(Key::MIN, Key::MAX)
    }
}
