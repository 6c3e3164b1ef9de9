//! # World Entities
//!
//! An entity is any addressable world object that owns a script: NPCs,
//! fixed interactive objects, items, cameras and markers.

use crate::{EntityId, IoFlags, ItemType, Vec3};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Individual world object
///
/// # Purpose
/// Holds the attributes the interpreter queries when filtering event
/// targets and evaluating conditions.
///
/// # Thread Safety
/// Mutable attributes are internally synchronized so entities can be
/// shared as `Arc<Entity>` between the registry and the interpreter.
#[derive(Debug)]
pub struct Entity {
    /// Unique entity ID
    pub id: EntityId,

    /// Scoped name used by scripts (e.g. `goblin_0001`)
    pub name: String,

    /// Object kind
    pub io_flags: IoFlags,

    /// Item classification
    pub item_type: ItemType,

    position: RwLock<Vec3>,
    groups: RwLock<HashSet<String>>,
    idle: AtomicBool,
    sent: AtomicU64,
}

impl Entity {
    /// Create a new entity at the origin
    ///
    /// # Arguments
    /// * `id` - Unique entity identifier
    /// * `name` - Name scripts address it by
    /// * `io_flags` - Kind of object
    pub fn new(id: EntityId, name: impl Into<String>, io_flags: IoFlags) -> Self {
        Self {
            id,
            name: name.into(),
            io_flags,
            item_type: ItemType::empty(),
            position: RwLock::new(Vec3::ZERO),
            groups: RwLock::new(HashSet::new()),
            idle: AtomicBool::new(true),
            sent: AtomicU64::new(0),
        }
    }

    /// Builder-style position setter
    pub fn at(self, position: Vec3) -> Self {
        *self.position.write() = position;
        self
    }

    /// Builder-style item type setter
    pub fn with_item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    /// Builder-style group membership
    pub fn in_group(self, group: impl Into<String>) -> Self {
        self.groups.write().insert(group.into());
        self
    }

    pub fn position(&self) -> Vec3 {
        *self.position.read()
    }

    pub fn set_position(&self, position: Vec3) {
        *self.position.write() = position;
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.groups.read().contains(group)
    }

    pub fn add_group(&self, group: impl Into<String>) {
        self.groups.write().insert(group.into());
    }

    pub fn remove_group(&self, group: &str) -> bool {
        self.groups.write().remove(group)
    }

    /// Whether the entity is currently idle (not busy with an action)
    pub fn is_idle(&self) -> bool {
        self.idle.load(Ordering::Relaxed)
    }

    pub fn set_idle(&self, idle: bool) {
        self.idle.store(idle, Ordering::Relaxed);
    }

    /// Count one event sent by this entity
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of events this entity has sent
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let entity = Entity::new(EntityId::new(3), "goblin_0003", IoFlags::NPC)
            .at(Vec3::new(1.0, 0.0, 2.0))
            .in_group("enemies");

        assert_eq!(entity.id.get(), 3);
        assert_eq!(entity.position(), Vec3::new(1.0, 0.0, 2.0));
        assert!(entity.is_in_group("enemies"));
        assert!(!entity.is_in_group("friends"));
        assert!(entity.is_idle());
    }

    #[test]
    fn test_sent_counter() {
        let entity = Entity::new(EntityId::new(1), "door_0001", IoFlags::FIX);
        entity.record_sent();
        entity.record_sent();
        assert_eq!(entity.sent_count(), 2);
    }
}
