//! Point lookups

use crate::error::IndexResult;
use crate::page::Page;
use crate::reader::{PageSource, PagedIndex};
use crate::slot::{Key, Payload};

impl<S: PageSource> PagedIndex<S> {
    /// Look up `key`, returning `None` when it is not indexed
    ///
    /// Descends from the root, following the first reference slot whose key
    /// is not below `key`. Each step reads exactly one page.
    pub fn search(&self, key: Key) -> IndexResult<Option<Payload>> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut offset = self.root_offset();
        loop {
            match self.read_page(offset)? {
                Page::Leaf(slots) => {
                    let idx = slots.partition_point(|s| s.key < key);
                    return Ok(slots
                        .get(idx)
                        .filter(|s| s.key == key)
                        .map(|s| s.payload));
                }
                Page::Reference(slots) => {
                    let idx = slots.partition_point(|s| s.key < key);
                    // key is above every representative key on this page
                    let Some(slot) = slots.get(idx) else {
                        return Ok(None);
                    };
                    offset = self.child_offset(offset, slot.child)?;
                }
            }
        }
    }

    /// Look up `key`, returning `default` when it is not indexed
    pub fn get(&self, key: Key, default: Payload) -> IndexResult<Payload> {
        Ok(self.search(key)?.unwrap_or(default))
    }

    /// Check if `key` is indexed
    pub fn contains_key(&self, key: Key) -> IndexResult<bool> {
        Ok(self.search(key)?.is_some())
    }
}
