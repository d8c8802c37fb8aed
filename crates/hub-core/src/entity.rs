//! Entity identity and resolution

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// External identifier of a device or endpoint (e.g. `"sensor1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A resolved entity handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Friendly name used by command transports for addressing.
    pub name: String,
}

impl Entity {
    /// Create an entity whose name is its identifier.
    #[must_use]
    pub fn new(id: impl Into<EntityId>) -> Self {
        let id = id.into();
        let name = id.to_string();
        Self { id, name }
    }

    /// Create an entity with an explicit friendly name.
    #[must_use]
    pub fn with_name(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Resolves entity identifiers to live handles.
pub trait EntityDirectory: Send + Sync {
    /// Look up an entity by id. `None` when the id is unknown.
    fn resolve(&self, id: &EntityId) -> Option<Entity>;
}

/// In-memory entity directory, populated by device discovery.
#[derive(Default)]
pub struct EntityRegistry {
    entities: DashMap<EntityId, Entity>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entity. The registry keys on `entity.id`.
    pub fn register(&self, entity: Entity) {
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn remove(&self, id: &EntityId) -> Option<Entity> {
        self.entities.remove(id).map(|(_, entity)| entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityDirectory for EntityRegistry {
    fn resolve(&self, id: &EntityId) -> Option<Entity> {
        self.entities.get(id).map(|entry| entry.value().clone())
    }
}
