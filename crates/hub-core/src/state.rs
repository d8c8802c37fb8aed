//! Cached entity state

use crate::entity::{Entity, EntityId};
use crate::event::StateChange;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Full attribute snapshot of a single entity.
pub type AttributeMap = HashMap<String, Value>;

/// Binary switch state as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnOff {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl OnOff {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    /// Read the `state` attribute of a snapshot, if it holds a known
    /// on/off value.
    #[must_use]
    pub fn from_attributes(attributes: &AttributeMap) -> Option<Self> {
        match attributes.get("state").and_then(Value::as_str) {
            Some("ON") => Some(Self::On),
            Some("OFF") => Some(Self::Off),
            _ => None,
        }
    }
}

/// Read access to the last known state of entities.
pub trait StateStore: Send + Sync {
    /// Current attribute snapshot for an entity; empty if never seen.
    fn get(&self, entity: &Entity) -> AttributeMap;
}

/// In-memory cache of the last seen attributes per entity.
///
/// Adapters feed every device report through [`StateCache::apply`], which
/// merges the changed attributes into the retained snapshot and yields the
/// [`StateChange`] event consumed downstream.
#[derive(Default)]
pub struct StateCache {
    states: DashMap<EntityId, AttributeMap>,
}

impl StateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an entity's snapshot outright.
    pub fn set(&self, entity_id: EntityId, attributes: AttributeMap) {
        self.states.insert(entity_id, attributes);
    }

    /// Merge a partial update into the cached snapshot and report the
    /// transition with full before/after snapshots.
    pub fn apply(&self, entity_id: &EntityId, update: AttributeMap) -> StateChange {
        let mut entry = self.states.entry(entity_id.clone()).or_default();
        let from = entry.clone();
        for (key, value) in &update {
            entry.insert(key.clone(), value.clone());
        }
        let to = entry.clone();
        drop(entry);

        tracing::debug!("State update for '{}': {} attribute(s)", entity_id, update.len());
        StateChange {
            entity_id: entity_id.clone(),
            update,
            from,
            to,
        }
    }
}

impl StateStore for StateCache {
    fn get(&self, entity: &Entity) -> AttributeMap {
        self.states
            .get(&entity.id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_reports_before_and_after_snapshots() {
        let cache = StateCache::new();
        let id = EntityId::from("sensor1");
        cache.set(
            id.clone(),
            AttributeMap::from([
                ("temperature".to_string(), json!(24)),
                ("battery".to_string(), json!(98)),
            ]),
        );

        let change = cache.apply(
            &id,
            AttributeMap::from([("temperature".to_string(), json!(26))]),
        );

        assert_eq!(change.from["temperature"], json!(24));
        assert_eq!(change.to["temperature"], json!(26));
        // Untouched attributes survive the merge in both snapshots.
        assert_eq!(change.from["battery"], json!(98));
        assert_eq!(change.to["battery"], json!(98));
        assert_eq!(change.update.len(), 1);
    }

    #[test]
    fn apply_starts_from_empty_for_unknown_entities() {
        let cache = StateCache::new();
        let change = cache.apply(
            &EntityId::from("switch1"),
            AttributeMap::from([("action".to_string(), json!("single"))]),
        );

        assert!(change.from.is_empty());
        assert_eq!(change.to["action"], json!("single"));
    }

    #[test]
    fn on_off_reads_only_known_values() {
        let on = AttributeMap::from([("state".to_string(), json!("ON"))]);
        assert_eq!(OnOff::from_attributes(&on), Some(OnOff::On));

        let dim = AttributeMap::from([("state".to_string(), json!(128))]);
        assert_eq!(OnOff::from_attributes(&dim), None);
        assert_eq!(OnOff::from_attributes(&AttributeMap::new()), None);

        assert_eq!(OnOff::On.toggled(), OnOff::Off);
    }
}
