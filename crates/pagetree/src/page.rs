//! Fixed-capacity page codec
//!
//! Every page occupies exactly [`page_len`] bytes regardless of how many
//! slots are live, which keeps page offsets computable from the header alone.
//!
//! ```text
//! Page (little-endian):
//! ├── tag (u8)          1 = leaf, 2 = reference
//! ├── reserved ([u8; 3]) zero
//! ├── live (u32)        number of live slots, 1..=capacity
//! └── slots (capacity × 24 bytes)
//!     ├── key (u64)
//!     ├── a (u64)       leaf: payload.data, reference: child offset
//!     └── b (u64)       leaf: payload.aux,  reference: zero
//! ```
//!
//! Slots past `live` are high-key sentinels (`PADDING_KEY`, 0, 0). The live
//! count decides where a page ends; the sentinel only keeps the padding
//! bytes deterministic and checkable.

use crate::constants::{PADDING_KEY, PAGE_HEADER_SIZE, SLOT_SIZE};
use crate::error::{IndexError, IndexResult};
use crate::slot::{Key, LeafSlot, Payload, RefSlot};
use binrw::{BinRead, BinWrite};
use std::io::Cursor;

/// Encoded length of a page holding `capacity` slots
pub const fn page_len(capacity: usize) -> usize {
    PAGE_HEADER_SIZE + capacity * SLOT_SIZE
}

/// Page tag distinguishing leaf pages from reference pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// Slots hold payloads
    Leaf,
    /// Slots hold child page offsets
    Reference,
}

impl PageKind {
    /// Decode the on-disk tag byte
    pub fn from_byte(tag: u8) -> IndexResult<Self> {
        match tag {
            1 => Ok(Self::Leaf),
            2 => Ok(Self::Reference),
            other => Err(IndexError::InvalidPageTag(other)),
        }
    }

    /// On-disk tag byte
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Leaf => 1,
            Self::Reference => 2,
        }
    }
}

#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
struct PageHeader {
    tag: u8,
    reserved: [u8; 3],
    live: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
struct RawSlot {
    key: u64,
    a: u64,
    b: u64,
}

const PADDING_SLOT: RawSlot = RawSlot {
    key: PADDING_KEY,
    a: 0,
    b: 0,
};

/// Decoded page: an ordered run of slots sharing one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// Leaf page
    Leaf(Vec<LeafSlot>),
    /// Reference page
    Reference(Vec<RefSlot>),
}

impl Page {
    /// Tag of this page
    pub fn kind(&self) -> PageKind {
        match self {
            Self::Leaf(_) => PageKind::Leaf,
            Self::Reference(_) => PageKind::Reference,
        }
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        match self {
            Self::Leaf(slots) => slots.len(),
            Self::Reference(slots) => slots.len(),
        }
    }

    /// Check if the page has no live slots
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot keys in page order
    pub fn keys(&self) -> Vec<Key> {
        match self {
            Self::Leaf(slots) => slots.iter().map(|s| s.key).collect(),
            Self::Reference(slots) => slots.iter().map(|s| s.key).collect(),
        }
    }

    /// Smallest key in the page
    pub fn min_key(&self) -> Option<Key> {
        match self {
            Self::Leaf(slots) => slots.first().map(|s| s.key),
            Self::Reference(slots) => slots.first().map(|s| s.key),
        }
    }

    /// Largest key in the page; this becomes the page's representative key
    pub fn max_key(&self) -> Option<Key> {
        match self {
            Self::Leaf(slots) => slots.last().map(|s| s.key),
            Self::Reference(slots) => slots.last().map(|s| s.key),
        }
    }

    fn raw_slots(&self) -> Vec<RawSlot> {
        match self {
            Self::Leaf(slots) => slots
                .iter()
                .map(|s| RawSlot {
                    key: s.key,
                    a: s.payload.data,
                    b: s.payload.aux,
                })
                .collect(),
            Self::Reference(slots) => slots
                .iter()
                .map(|s| RawSlot {
                    key: s.key,
                    a: s.child,
                    b: 0,
                })
                .collect(),
        }
    }

    /// Encode the page into exactly `page_len(capacity)` bytes
    pub fn encode(&self, capacity: usize) -> IndexResult<Vec<u8>> {
        let live = self.len();
        if live == 0 {
            return Err(IndexError::InvalidPage("cannot encode an empty page".into()));
        }
        if live > capacity {
            return Err(IndexError::CapacityMismatch {
                capacity,
                actual: live,
            });
        }

        let raw = self.raw_slots();
        if !is_strictly_increasing(&raw) {
            return Err(IndexError::UnsortedSlots);
        }

        let mut cursor = Cursor::new(Vec::with_capacity(page_len(capacity)));
        PageHeader {
            tag: self.kind().as_byte(),
            reserved: [0; 3],
            live: live as u32,
        }
        .write(&mut cursor)?;

        for slot in &raw {
            slot.write(&mut cursor)?;
        }
        for _ in live..capacity {
            PADDING_SLOT.write(&mut cursor)?;
        }

        Ok(cursor.into_inner())
    }

    /// Decode a page previously produced by [`Page::encode`]
    pub fn decode(bytes: &[u8], capacity: usize) -> IndexResult<Self> {
        let expected = page_len(capacity);
        if bytes.len() < expected {
            return Err(IndexError::TruncatedPage {
                expected,
                actual: bytes.len(),
            });
        }
        if bytes.len() != expected {
            return Err(IndexError::CapacityMismatch {
                capacity,
                actual: (bytes.len() - PAGE_HEADER_SIZE) / SLOT_SIZE,
            });
        }

        let mut cursor = Cursor::new(bytes);
        let header = PageHeader::read(&mut cursor)?;
        let kind = PageKind::from_byte(header.tag)?;

        if header.reserved != [0; 3] {
            return Err(IndexError::InvalidPage(format!(
                "reserved bytes should be zero, got {:?}",
                header.reserved
            )));
        }

        let live = header.live as usize;
        if live == 0 {
            return Err(IndexError::InvalidPage("page has no live slots".into()));
        }
        if live > capacity {
            return Err(IndexError::CapacityMismatch {
                capacity,
                actual: live,
            });
        }

        let mut raw = Vec::with_capacity(live);
        for _ in 0..live {
            raw.push(RawSlot::read(&mut cursor)?);
        }
        for idx in live..capacity {
            if RawSlot::read(&mut cursor)? != PADDING_SLOT {
                return Err(IndexError::InvalidPage(format!(
                    "slot {idx} past the live count is not padding"
                )));
            }
        }

        if !is_strictly_increasing(&raw) {
            return Err(IndexError::UnsortedSlots);
        }

        match kind {
            PageKind::Leaf => Ok(Self::Leaf(
                raw.into_iter()
                    .map(|s| LeafSlot {
                        key: s.key,
                        payload: Payload::new(s.a, s.b),
                    })
                    .collect(),
            )),
            PageKind::Reference => {
                if raw.iter().any(|s| s.b != 0) {
                    return Err(IndexError::InvalidPage(
                        "reference slot carries a non-zero auxiliary word".into(),
                    ));
                }
                Ok(Self::Reference(
                    raw.into_iter()
                        .map(|s| RefSlot {
                            key: s.key,
                            child: s.a,
                        })
                        .collect(),
                ))
            }
        }
    }
}

fn is_strictly_increasing(slots: &[RawSlot]) -> bool {
    slots.windows(2).all(|pair| pair[0].key < pair[1].key)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn leaf(keys: &[u64]) -> Page {
        Page::Leaf(
            keys.iter()
                .map(|&key| LeafSlot {
                    key,
                    payload: Payload::new(key.wrapping_mul(10), key.wrapping_add(1)),
                })
                .collect(),
        )
    }

    #[test]
    fn test_leaf_page_round_trip() {
        let page = leaf(&[3, 7, 11]);
        let bytes = page.encode(4).expect("Operation should succeed");
        assert_eq!(bytes.len(), page_len(4));
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[4..8], &3u32.to_le_bytes());

        let decoded = Page::decode(&bytes, 4).expect("Operation should succeed");
        assert_eq!(decoded, page);
        assert_eq!(decoded.max_key(), Some(11));
        assert_eq!(decoded.min_key(), Some(3));
    }

    #[test]
    fn test_reference_page_round_trip() {
        let page = Page::Reference(vec![
            RefSlot { key: 20, child: 52 },
            RefSlot {
                key: 30,
                child: 108,
            },
        ]);
        let bytes = page.encode(2).expect("Operation should succeed");
        assert_eq!(bytes[0], 2);
        // first slot: key then child offset then zero word
        assert_eq!(&bytes[8..16], &20u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &52u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &[0u8; 8]);

        let decoded = Page::decode(&bytes, 2).expect("Operation should succeed");
        assert_eq!(decoded.kind(), PageKind::Reference);
        assert_eq!(decoded, page);
    }

    #[test]
    fn test_underfull_page_padding() {
        let bytes = leaf(&[5]).encode(3).expect("Operation should succeed");
        let tail = &bytes[PAGE_HEADER_SIZE + SLOT_SIZE..];
        assert_eq!(tail.len(), 2 * SLOT_SIZE);
        for slot in tail.chunks(SLOT_SIZE) {
            assert_eq!(&slot[..8], &u64::MAX.to_le_bytes());
            assert!(slot[8..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_max_key_sentinel_as_live_key() {
        // u64::MAX is a legal key; the live count tells it apart from padding
        let page = leaf(&[1, u64::MAX]);
        let bytes = page.encode(4).expect("Operation should succeed");
        let decoded = Page::decode(&bytes, 4).expect("Operation should succeed");
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.max_key(), Some(u64::MAX));
        assert_eq!(decoded, page);
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = leaf(&[1, 2]).encode(2).expect("Operation should succeed");
        let result = Page::decode(&bytes[..bytes.len() - 1], 2);
        assert!(matches!(
            result,
            Err(IndexError::TruncatedPage {
                expected: 56,
                actual: 55
            })
        ));
    }

    #[test]
    fn test_decode_capacity_mismatch() {
        let bytes = leaf(&[1, 2]).encode(4).expect("Operation should succeed");
        assert!(matches!(
            Page::decode(&bytes, 2),
            Err(IndexError::CapacityMismatch {
                capacity: 2,
                actual: 4
            })
        ));

        let mut bytes = leaf(&[1, 2]).encode(2).expect("Operation should succeed");
        bytes[4..8].copy_from_slice(&3u32.to_le_bytes());
        assert!(matches!(
            Page::decode(&bytes, 2),
            Err(IndexError::CapacityMismatch {
                capacity: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_decode_invalid_tag() {
        let mut bytes = leaf(&[1]).encode(1).expect("Operation should succeed");
        bytes[0] = 9;
        let err = Page::decode(&bytes, 1).unwrap_err();
        assert!(matches!(err, IndexError::InvalidPageTag(9)));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_decode_rejects_unsorted_and_padding() {
        let mut bytes = leaf(&[1, 2]).encode(3).expect("Operation should succeed");
        // swap the two keys
        bytes[8..16].copy_from_slice(&2u64.to_le_bytes());
        bytes[32..40].copy_from_slice(&1u64.to_le_bytes());
        assert!(matches!(
            Page::decode(&bytes, 3),
            Err(IndexError::UnsortedSlots)
        ));

        let mut bytes = leaf(&[1, 2]).encode(3).expect("Operation should succeed");
        let last = bytes.len() - 1;
        bytes[last] = 1;
        assert!(matches!(
            Page::decode(&bytes, 3),
            Err(IndexError::InvalidPage(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_page() {
        let mut bytes = leaf(&[1]).encode(1).expect("Operation should succeed");
        bytes[4..8].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Page::decode(&bytes, 1),
            Err(IndexError::InvalidPage(_))
        ));
    }

    #[test]
    fn test_encode_validation() {
        assert!(matches!(
            Page::Leaf(Vec::new()).encode(4),
            Err(IndexError::InvalidPage(_))
        ));
        assert!(matches!(
            leaf(&[1, 2, 3]).encode(2),
            Err(IndexError::CapacityMismatch {
                capacity: 2,
                actual: 3
            })
        ));
        assert!(matches!(
            leaf(&[4, 4]).encode(2),
            Err(IndexError::UnsortedSlots)
        ));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use proptest::test_runner::TestCaseError;
        use std::collections::BTreeMap;

        proptest! {
            /// Any sorted run of slots survives encode/decode at any capacity that holds it
            #[test]
            fn leaf_page_codec_preserves_slots(
                entries in prop::collection::btree_map(any::<u64>(), (any::<u64>(), any::<u64>()), 1..32),
                slack in 0usize..8
            ) {
                let entries: BTreeMap<u64, (u64, u64)> = entries;
                let page = Page::Leaf(
                    entries
                        .iter()
                        .map(|(&key, &value)| LeafSlot { key, payload: value.into() })
                        .collect(),
                );
                let capacity = entries.len() + slack;
                let bytes = page.encode(capacity).map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(bytes.len(), page_len(capacity));
                let decoded = Page::decode(&bytes, capacity).map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(decoded, page);
            }
        }
    }
}
