//! State-change events and the broadcast bus

use crate::entity::EntityId;
use crate::state::AttributeMap;
use tokio::sync::broadcast;

/// A state transition for one entity.
///
/// `update` carries only the attributes the originating report changed;
/// `from` and `to` are full snapshots either side of the merge.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub entity_id: EntityId,
    pub update: AttributeMap,
    pub from: AttributeMap,
    pub to: AttributeMap,
}

/// Broadcast channel distributing state changes to any number of listeners.
pub struct EventBus {
    tx: broadcast::Sender<StateChange>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.tx.subscribe()
    }

    /// Publish a state change. Dropped silently when nobody is subscribed.
    pub fn publish(&self, event: StateChange) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
