//! Per-event trigger classification

use crate::model::TriggerSpec;
use hub_core::AttributeMap;
use serde_json::Value;

/// Outcome of classifying one event against one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The event is the qualifying edge: evaluate conditions and run.
    Fire,
    /// The event is the opposing edge: cancel any pending debounce.
    Suppress,
    /// The event is irrelevant to this trigger.
    Ignore,
}

impl TriggerSpec {
    /// Classify a state-change event against this trigger.
    ///
    /// `update` is the event's changed-attribute payload; `from` and `to`
    /// are the full snapshots either side of it.
    #[must_use]
    pub fn evaluate(
        &self,
        update: &AttributeMap,
        from: &AttributeMap,
        to: &AttributeMap,
    ) -> TriggerOutcome {
        match self {
            Self::Action { actions, .. } => evaluate_action(actions, update),
            Self::State {
                attribute, values, ..
            } => evaluate_state(attribute, values, update, from, to),
            Self::NumericState {
                attribute,
                above,
                below,
                ..
            } => evaluate_numeric(attribute, *above, *below, update, from, to),
        }
    }
}

/// Discrete action events carry no hysteresis: a non-matching action name
/// is nothing to act on, never an opposing edge.
fn evaluate_action(actions: &[String], update: &AttributeMap) -> TriggerOutcome {
    match update.get("action").and_then(Value::as_str) {
        Some(name) if actions.iter().any(|action| action == name) => TriggerOutcome::Fire,
        _ => TriggerOutcome::Ignore,
    }
}

fn evaluate_state(
    attribute: &str,
    values: &[String],
    update: &AttributeMap,
    from: &AttributeMap,
    to: &AttributeMap,
) -> TriggerOutcome {
    let (Some(reported), Some(old), Some(new)) =
        (update.get(attribute), from.get(attribute), to.get(attribute))
    else {
        return TriggerOutcome::Ignore;
    };
    if old == new {
        return TriggerOutcome::Ignore;
    }

    let matched = reported
        .as_str()
        .is_some_and(|value| values.iter().any(|monitored| monitored == value));
    if matched {
        TriggerOutcome::Fire
    } else {
        // A transition away from the monitored values is the opposing
        // edge, distinct from "never matched".
        TriggerOutcome::Suppress
    }
}

fn evaluate_numeric(
    attribute: &str,
    above: Option<f64>,
    below: Option<f64>,
    update: &AttributeMap,
    from: &AttributeMap,
    to: &AttributeMap,
) -> TriggerOutcome {
    let (Some(_), Some(old), Some(new)) = (
        number(update, attribute),
        number(from, attribute),
        number(to, attribute),
    ) else {
        return TriggerOutcome::Ignore;
    };
    if old == new {
        return TriggerOutcome::Ignore;
    }

    // Each configured gate is an independent hysteresis check; a rule
    // fires only on the crossing into range, not while it stays there.
    if let Some(threshold) = above {
        if new < threshold {
            return TriggerOutcome::Suppress;
        }
        if old >= threshold {
            return TriggerOutcome::Ignore;
        }
    }
    if let Some(threshold) = below {
        if new > threshold {
            return TriggerOutcome::Suppress;
        }
        if old <= threshold {
            return TriggerOutcome::Ignore;
        }
    }
    TriggerOutcome::Fire
}

fn number(attributes: &AttributeMap, attribute: &str) -> Option<f64> {
    attributes.get(attribute).and_then(Value::as_f64)
}
