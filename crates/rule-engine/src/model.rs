//! Compiled rule records and the per-entity index

use hub_core::{EntityId, OnOff};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Opaque rule identifier, unique per compiled rule and stable for the
/// lifetime of the engine. Sole key for pending-timer bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(Uuid);

impl RuleId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What initiates a rule.
#[derive(Debug, Clone)]
pub enum TriggerSpec {
    /// Fires on a named discrete event (button press, gesture).
    Action {
        entities: Vec<EntityId>,
        actions: Vec<String>,
        debounce: Option<Duration>,
    },
    /// Fires on an attribute value transition into `values`.
    State {
        entities: Vec<EntityId>,
        attribute: String,
        values: Vec<String>,
        debounce: Option<Duration>,
    },
    /// Fires on a numeric threshold crossing, edge-triggered.
    NumericState {
        entities: Vec<EntityId>,
        attribute: String,
        above: Option<f64>,
        below: Option<f64>,
        debounce: Option<Duration>,
    },
}

impl TriggerSpec {
    /// Source entities the trigger listens on.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        match self {
            Self::Action { entities, .. }
            | Self::State { entities, .. }
            | Self::NumericState { entities, .. } => entities,
        }
    }

    /// Delay between the trigger firing and the actions running.
    #[must_use]
    pub fn debounce(&self) -> Option<Duration> {
        match self {
            Self::Action { debounce, .. }
            | Self::State { debounce, .. }
            | Self::NumericState { debounce, .. } => *debounce,
        }
    }
}

/// A guard evaluated against current system state at run time, never
/// against the triggering event's payload.
#[derive(Debug, Clone)]
pub enum ConditionSpec {
    State {
        entity: EntityId,
        attribute: String,
        value: String,
    },
    NumericState {
        entity: EntityId,
        attribute: String,
        above: Option<f64>,
        below: Option<f64>,
    },
    /// Time strings stay raw here; they are parsed when checked and fail
    /// open when malformed.
    TimeWindow {
        after: Option<String>,
        before: Option<String>,
        weekdays: Option<Vec<String>>,
    },
}

/// Service to invoke on an action's target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    TurnOn,
    TurnOff,
    Toggle,
    Custom,
}

impl Service {
    /// Desired on/off value for the switch services; `None` for custom
    /// payloads, which are opaque to the engine.
    #[must_use]
    pub fn switch_target(self, current: Option<OnOff>) -> Option<OnOff> {
        match self {
            Self::TurnOn => Some(OnOff::On),
            Self::TurnOff => Some(OnOff::Off),
            Self::Toggle => Some(current.map_or(OnOff::On, OnOff::toggled)),
            Self::Custom => None,
        }
    }
}

/// One command emission.
#[derive(Debug, Clone)]
pub struct ActionSpec {
    pub entity: EntityId,
    pub service: Service,
    pub data: Option<Value>,
}

/// A validated, normalized rule.
#[derive(Debug)]
pub struct CompiledRule {
    pub id: RuleId,
    /// Config key the rule was defined under, kept for log context.
    pub name: String,
    pub trigger: TriggerSpec,
    pub conditions: Vec<ConditionSpec>,
    pub actions: Vec<ActionSpec>,
}

/// Read-only lookup structure built once by the compiler.
#[derive(Debug, Default)]
pub struct RuleIndex {
    by_entity: HashMap<EntityId, Vec<Arc<CompiledRule>>>,
    by_id: HashMap<RuleId, Arc<CompiledRule>>,
}

impl RuleIndex {
    pub(crate) fn insert(&mut self, rule: CompiledRule) {
        let rule = Arc::new(rule);
        for entity in rule.trigger.entities() {
            self.by_entity
                .entry(entity.clone())
                .or_default()
                .push(Arc::clone(&rule));
        }
        self.by_id.insert(rule.id, rule);
    }

    /// Rules whose trigger references `entity`, in definition order.
    #[must_use]
    pub fn rules_for(&self, entity: &EntityId) -> &[Arc<CompiledRule>] {
        self.by_entity.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<&Arc<CompiledRule>> {
        self.by_id.get(&id)
    }

    /// Number of compiled rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
