//! Outbound command seam

use crate::entity::Entity;
use serde_json::Value;

/// Fire-and-forget sink for outbound entity commands.
///
/// Implementations deliver the payload to the entity's transport (an MQTT
/// `<base>/<name>/set` topic, a radio request). Delivery is not acknowledged
/// back to the caller and must not block it.
pub trait CommandSink: Send + Sync {
    fn send(&self, target: &Entity, payload: Value);
}
