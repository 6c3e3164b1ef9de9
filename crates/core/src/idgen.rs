//! Entity ID generation

use crate::EntityId;
use std::sync::atomic::{self, AtomicU32};

/// Thread-safe monotonic ID generator
pub struct IdGenerator {
    next_id: AtomicU32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create a generator whose first ID is `first`
    pub fn starting_at(first: u32) -> Self {
        Self {
            next_id: AtomicU32::new(first),
        }
    }

    /// Get the next available ID
    pub fn next_id(&self) -> EntityId {
        EntityId(self.next_id.fetch_add(1, atomic::Ordering::Relaxed))
    }

    /// Make sure `id` will never be handed out
    pub fn reserve(&self, id: EntityId) {
        self.next_id.fetch_max(id.0.saturating_add(1), atomic::Ordering::Relaxed);
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
