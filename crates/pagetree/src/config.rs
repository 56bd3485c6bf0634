//! Configuration for index builds

use crate::constants::{DEFAULT_CAPACITY, MAX_CAPACITY, MIN_BUILD_CAPACITY};
use crate::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};

/// Configuration for building an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Slots per page; controls fan-out and tree depth
    pub capacity: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl BuildConfig {
    /// Create a configuration with the given page capacity
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Set the page capacity
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> IndexResult<()> {
        if self.capacity < MIN_BUILD_CAPACITY {
            return Err(IndexError::InvalidConfig(format!(
                "capacity must be at least {MIN_BUILD_CAPACITY}, got {}",
                self.capacity
            )));
        }
        if self.capacity > MAX_CAPACITY {
            return Err(IndexError::InvalidConfig(format!(
                "capacity must be at most {MAX_CAPACITY}, got {}",
                self.capacity
            )));
        }
        Ok(())
    }
}
