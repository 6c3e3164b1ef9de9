//! # Entity Manager
//!
//! This module manages the collection of all live entities.

use ember_core::{Entity, EntityId, EntityRegistry, IdGenerator, IoFlags};
use std::sync::Arc;

/// Entity Manager
///
/// # Purpose
/// Tracks all live entities and provides lookup by ID and by script name.
///
/// # Thread Safety
/// All operations are thread-safe using DashMap for concurrent access.
pub struct EntityManager {
    /// All entities
    /// Key: EntityId, Value: Entity handle
    entities: Arc<dashmap::DashMap<EntityId, Arc<Entity>>>,

    ids: IdGenerator,
}

impl EntityManager {
    /// Create a new entity manager
    ///
    /// # Returns
    /// An empty manager ready to track entities
    #[inline]
    pub fn new() -> Self {
        tracing::debug!("Creating EntityManager");

        Self {
            entities: Arc::new(dashmap::DashMap::new()),
            ids: IdGenerator::new(),
        }
    }

    /// Create and register an entity with a fresh ID
    ///
    /// # Arguments
    /// * `name` - Script-level name
    /// * `io_flags` - Kind of object
    /// * `configure` - Adjusts the entity before it becomes visible
    pub fn spawn(
        &self,
        name: impl Into<String>,
        io_flags: IoFlags,
        configure: impl FnOnce(Entity) -> Entity,
    ) -> Arc<Entity> {
        let entity = Arc::new(configure(Entity::new(self.ids.next_id(), name, io_flags)));
        self.insert(entity.clone());
        entity
    }

    /// Add an entity to the manager
    ///
    /// # Arguments
    /// * `entity` - The entity to add
    #[inline]
    pub fn insert(&self, entity: Arc<Entity>) {
        tracing::debug!("Adding entity {} ({})", entity.id.get(), entity.name);
        self.ids.reserve(entity.id);
        self.entities.insert(entity.id, entity);
    }

    /// Remove an entity from the manager
    ///
    /// # Arguments
    /// * `id` - The entity ID to remove
    #[inline]
    pub fn remove(&self, id: EntityId) -> Option<Arc<Entity>> {
        tracing::debug!("Removing entity {}", id.get());
        self.entities.remove(&id).map(|(_, entity)| entity)
    }

    /// Get the number of entities
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry for EntityManager {
    fn get(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.get(&id).map(|entry| entry.clone())
    }

    fn find(&self, name: &str, caller: Option<EntityId>) -> Option<Arc<Entity>> {
        match name.to_ascii_lowercase().as_str() {
            "" | "none" => None,
            "self" | "me" => caller.and_then(|id| self.get(id)),
            _ => self
                .entities
                .iter()
                .find(|entry| entry.name.eq_ignore_ascii_case(name))
                .map(|entry| entry.value().clone()),
        }
    }

    fn all(&self) -> Vec<Arc<Entity>> {
        let mut all: Vec<Arc<Entity>> =
            self.entities.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by_key(|entity| entity.id);
        all
    }
}
