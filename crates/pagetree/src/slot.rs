//! Keys, payloads and the typed slots stored inside pages

use serde::{Deserialize, Serialize};

/// Index key; unique within one built index, ordered by unsigned value
pub type Key = u64;

/// Fixed-size leaf value: a primary datum and an auxiliary datum
///
/// The index never interprets either field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Payload {
    /// Primary datum
    pub data: u64,
    /// Auxiliary datum
    pub aux: u64,
}

impl Payload {
    /// Create a new payload
    pub const fn new(data: u64, aux: u64) -> Self {
        Self { data, aux }
    }
}

impl From<(u64, u64)> for Payload {
    fn from((data, aux): (u64, u64)) -> Self {
        Self { data, aux }
    }
}

impl From<Payload> for (u64, u64) {
    fn from(payload: Payload) -> Self {
        (payload.data, payload.aux)
    }
}

/// Slot of a leaf page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafSlot {
    /// Key of the entry
    pub key: Key,
    /// Value stored for the key
    pub payload: Payload,
}

/// Slot of a reference page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefSlot {
    /// Largest key reachable under the child (its representative key)
    pub key: Key,
    /// Absolute file offset of the child page
    pub child: u64,
}
