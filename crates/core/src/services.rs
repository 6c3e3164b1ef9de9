//! Collaborator interfaces consumed by the script interpreter

use crate::{Entity, EntityId, Vec3};
use serde::Serialize;
use std::sync::Arc;

/// Lookup of live world entities
pub trait EntityRegistry {
    /// Lookup by identity
    fn get(&self, id: EntityId) -> Option<Arc<Entity>>;

    /// Lookup by a script-level name relative to `caller`
    ///
    /// `self` and `me` name the caller itself.
    fn find(&self, name: &str, caller: Option<EntityId>) -> Option<Arc<Entity>>;

    /// All live entities in ascending ID order
    fn all(&self) -> Vec<Arc<Entity>>;
}

/// A named region of the world
pub trait Zone {
    fn name(&self) -> &str;

    /// Point-in-zone containment test
    fn contains(&self, position: Vec3) -> bool;
}

/// Lookup of zones by name
pub trait ZoneService {
    fn find_zone(&self, name: &str) -> Option<&dyn Zone>;
}

/// An event waiting to be handled by its target's script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedEvent {
    pub target: EntityId,
    pub event: String,
    pub params: String,
    pub sender: Option<EntityId>,
}

/// Destination for dispatched events
pub trait EventSink {
    fn enqueue(&mut self, event: QueuedEvent);
}

/// Monotonic game time source
pub trait GameClock {
    fn now_ms(&self) -> u64;
}
