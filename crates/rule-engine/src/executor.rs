//! Action executor with idempotence checks

use crate::model::ActionSpec;
use hub_core::{CommandSink, EntityDirectory, OnOff, StateStore};
use serde_json::{json, Value};
use std::sync::Arc;

/// Resolves action targets and emits commands through the sink.
pub struct ActionExecutor {
    directory: Arc<dyn EntityDirectory>,
    states: Arc<dyn StateStore>,
    sink: Arc<dyn CommandSink>,
}

impl ActionExecutor {
    pub fn new(
        directory: Arc<dyn EntityDirectory>,
        states: Arc<dyn StateStore>,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        Self {
            directory,
            states,
            sink,
        }
    }

    /// Run every action in order. Unresolvable targets are skipped and
    /// the rest of the list still runs.
    pub fn run(&self, actions: &[ActionSpec]) {
        for action in actions {
            let Some(destination) = self.directory.resolve(&action.entity) else {
                tracing::debug!("Destination not found for entity '{}'", action.entity);
                continue;
            };

            let current = OnOff::from_attributes(&self.states.get(&destination));
            match action.service.switch_target(current) {
                // Custom payloads are opaque: no idempotence check.
                None => {
                    tracing::debug!("Sending custom payload to '{}'", action.entity);
                    self.sink
                        .send(&destination, action.data.clone().unwrap_or(Value::Null));
                }
                Some(desired) if current == Some(desired) => {
                    tracing::debug!(
                        "Entity '{}' already {}, skipping command",
                        action.entity,
                        desired.as_str()
                    );
                }
                Some(desired) => {
                    tracing::debug!("Turning '{}' {}", action.entity, desired.as_str());
                    self.sink
                        .send(&destination, json!({ "state": desired.as_str() }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Service;
    use hub_core::{AttributeMap, Entity, EntityId, EntityRegistry, StateCache};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        commands: Mutex<Vec<(EntityId, Value)>>,
    }

    impl RecordingSink {
        fn commands(&self) -> Vec<(EntityId, Value)> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl CommandSink for RecordingSink {
        fn send(&self, target: &Entity, payload: Value) {
            self.commands.lock().unwrap().push((target.id.clone(), payload));
        }
    }

    fn executor_with(
        entities: &[(&str, &str)],
    ) -> (ActionExecutor, Arc<StateCache>, Arc<RecordingSink>) {
        let registry = Arc::new(EntityRegistry::new());
        let states = Arc::new(StateCache::new());
        for (id, state) in entities {
            registry.register(Entity::new(*id));
            states.set(
                EntityId::from(*id),
                AttributeMap::from([("state".to_string(), json!(state))]),
            );
        }
        let sink = Arc::new(RecordingSink::default());
        let executor = ActionExecutor::new(
            registry,
            Arc::clone(&states) as Arc<dyn StateStore>,
            Arc::clone(&sink) as Arc<dyn CommandSink>,
        );
        (executor, states, sink)
    }

    fn action(entity: &str, service: Service) -> ActionSpec {
        ActionSpec {
            entity: EntityId::from(entity),
            service,
            data: None,
        }
    }

    #[test]
    fn turn_on_skips_when_already_on() {
        let (executor, _, sink) = executor_with(&[("lamp1", "ON")]);
        executor.run(&[action("lamp1", Service::TurnOn)]);
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn turn_on_emits_when_off() {
        let (executor, _, sink) = executor_with(&[("lamp1", "OFF")]);
        executor.run(&[action("lamp1", Service::TurnOn)]);
        assert_eq!(
            sink.commands(),
            vec![(EntityId::from("lamp1"), json!({"state": "ON"}))]
        );
    }

    #[test]
    fn toggle_flips_the_cached_state() {
        let (executor, _, sink) = executor_with(&[("lamp1", "ON")]);
        executor.run(&[action("lamp1", Service::Toggle)]);
        assert_eq!(
            sink.commands(),
            vec![(EntityId::from("lamp1"), json!({"state": "OFF"}))]
        );
    }

    #[test]
    fn custom_always_emits_its_payload() {
        let (executor, _, sink) = executor_with(&[("lamp1", "ON")]);
        let custom = ActionSpec {
            entity: EntityId::from("lamp1"),
            service: Service::Custom,
            data: Some(json!({"state": "ON", "brightness": 120})),
        };

        // Destination already matches, but custom payloads skip the check.
        executor.run(&[custom.clone(), custom]);
        assert_eq!(sink.commands().len(), 2);
        assert_eq!(sink.commands()[0].1["brightness"], json!(120));
    }

    #[test]
    fn unresolvable_target_does_not_abort_the_list() {
        let (executor, _, sink) = executor_with(&[("lamp2", "OFF")]);
        executor.run(&[
            action("ghost", Service::TurnOn),
            action("lamp2", Service::TurnOn),
        ]);
        assert_eq!(
            sink.commands(),
            vec![(EntityId::from("lamp2"), json!({"state": "ON"}))]
        );
    }
}
