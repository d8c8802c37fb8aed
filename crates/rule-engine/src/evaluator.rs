//! Condition evaluator for compiled rules

use crate::error::RuleError;
use crate::model::ConditionSpec;
use crate::time::{parse_time_of_day, weekday_code, TimeWindow};
use chrono::{Datelike, Local, NaiveTime, Weekday};
use hub_core::{EntityDirectory, EntityId, StateStore};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_AFTER: &str = "00:00:00";
const DEFAULT_BEFORE: &str = "23:59:59";

/// Evaluates rule guards against current cached state.
///
/// Checks fail open: an unresolvable entity or a malformed time string
/// logs a warning and counts as satisfied rather than blocking the rule.
pub struct ConditionEvaluator {
    directory: Arc<dyn EntityDirectory>,
    states: Arc<dyn StateStore>,
}

impl ConditionEvaluator {
    pub fn new(directory: Arc<dyn EntityDirectory>, states: Arc<dyn StateStore>) -> Self {
        Self { directory, states }
    }

    /// All conditions must pass; an empty list passes.
    #[must_use]
    pub fn check_all(&self, conditions: &[ConditionSpec]) -> bool {
        conditions.iter().all(|condition| self.check(condition))
    }

    #[must_use]
    pub fn check(&self, condition: &ConditionSpec) -> bool {
        match condition {
            ConditionSpec::State {
                entity,
                attribute,
                value,
            } => self.check_state(entity, attribute, value),
            ConditionSpec::NumericState {
                entity,
                attribute,
                above,
                below,
            } => self.check_numeric(entity, attribute, *above, *below),
            ConditionSpec::TimeWindow {
                after,
                before,
                weekdays,
            } => {
                let now = Local::now();
                match check_time_window_at(
                    after.as_deref(),
                    before.as_deref(),
                    weekdays.as_deref(),
                    now.time(),
                    now.weekday(),
                ) {
                    Ok(satisfied) => satisfied,
                    Err(error) => {
                        tracing::warn!("{}, treating time condition as satisfied", error);
                        true
                    }
                }
            }
        }
    }

    fn check_state(&self, entity: &EntityId, attribute: &str, value: &str) -> bool {
        let Some(target) = self.resolve(entity) else {
            return true;
        };
        let attributes = self.states.get(&target);
        attributes.get(attribute).and_then(Value::as_str) == Some(value)
    }

    fn check_numeric(
        &self,
        entity: &EntityId,
        attribute: &str,
        above: Option<f64>,
        below: Option<f64>,
    ) -> bool {
        let Some(target) = self.resolve(entity) else {
            return true;
        };
        let attributes = self.states.get(&target);
        // An absent or non-numeric reading constrains nothing.
        let Some(current) = attributes.get(attribute).and_then(Value::as_f64) else {
            return true;
        };

        if let Some(threshold) = above {
            if current < threshold {
                return false;
            }
        }
        if let Some(threshold) = below {
            if current > threshold {
                return false;
            }
        }
        true
    }

    fn resolve(&self, entity: &EntityId) -> Option<hub_core::Entity> {
        let resolved = self.directory.resolve(entity);
        if resolved.is_none() {
            tracing::warn!(
                "{}, treating condition as satisfied",
                RuleError::EntityNotFound(entity.clone())
            );
        }
        resolved
    }
}

/// Pure time-window check against an explicit instant; [`ConditionEvaluator::check`]
/// feeds it the current local time.
fn check_time_window_at(
    after: Option<&str>,
    before: Option<&str>,
    weekdays: Option<&[String]>,
    now: NaiveTime,
    day: Weekday,
) -> Result<bool, RuleError> {
    let window = TimeWindow::new(
        parse_time_of_day(after.unwrap_or(DEFAULT_AFTER))?,
        parse_time_of_day(before.unwrap_or(DEFAULT_BEFORE))?,
    );
    if !window.contains(now) {
        return Ok(false);
    }
    Ok(match weekdays {
        Some(days) => days.iter().any(|code| code == weekday_code(day)),
        None => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::{AttributeMap, Entity, EntityRegistry, StateCache};
    use serde_json::json;

    fn evaluator_with(entities: &[(&str, AttributeMap)]) -> ConditionEvaluator {
        let registry = Arc::new(EntityRegistry::new());
        let states = Arc::new(StateCache::new());
        for (id, attributes) in entities {
            registry.register(Entity::new(*id));
            states.set(EntityId::from(*id), attributes.clone());
        }
        ConditionEvaluator::new(registry, states)
    }

    fn attrs(pairs: &[(&str, Value)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn state_condition_reads_current_state() {
        let evaluator = evaluator_with(&[("presence", attrs(&[("state", json!("ON"))]))]);

        assert!(evaluator.check(&ConditionSpec::State {
            entity: EntityId::from("presence"),
            attribute: "state".to_string(),
            value: "ON".to_string(),
        }));
        assert!(!evaluator.check(&ConditionSpec::State {
            entity: EntityId::from("presence"),
            attribute: "state".to_string(),
            value: "OFF".to_string(),
        }));
    }

    #[test]
    fn unresolvable_entity_fails_open() {
        let evaluator = evaluator_with(&[]);

        assert!(evaluator.check(&ConditionSpec::State {
            entity: EntityId::from("ghost"),
            attribute: "state".to_string(),
            value: "ON".to_string(),
        }));
        assert!(evaluator.check(&ConditionSpec::NumericState {
            entity: EntityId::from("ghost"),
            attribute: "temperature".to_string(),
            above: Some(25.0),
            below: None,
        }));
    }

    #[test]
    fn numeric_condition_applies_static_thresholds() {
        let evaluator = evaluator_with(&[("sensor1", attrs(&[("temperature", json!(21.5))]))]);

        let above_20 = ConditionSpec::NumericState {
            entity: EntityId::from("sensor1"),
            attribute: "temperature".to_string(),
            above: Some(20.0),
            below: None,
        };
        let above_25 = ConditionSpec::NumericState {
            entity: EntityId::from("sensor1"),
            attribute: "temperature".to_string(),
            above: Some(25.0),
            below: None,
        };
        let below_25 = ConditionSpec::NumericState {
            entity: EntityId::from("sensor1"),
            attribute: "temperature".to_string(),
            above: None,
            below: Some(25.0),
        };

        assert!(evaluator.check(&above_20));
        assert!(!evaluator.check(&above_25));
        assert!(evaluator.check(&below_25));
    }

    #[test]
    fn numeric_condition_with_unreadable_attribute_is_satisfied() {
        let evaluator = evaluator_with(&[("sensor1", attrs(&[("temperature", json!("warm"))]))]);

        assert!(evaluator.check(&ConditionSpec::NumericState {
            entity: EntityId::from("sensor1"),
            attribute: "temperature".to_string(),
            above: Some(25.0),
            below: None,
        }));
    }

    #[test]
    fn malformed_time_string_fails_open() {
        let evaluator = evaluator_with(&[]);

        // Satisfied no matter when the test runs.
        assert!(evaluator.check(&ConditionSpec::TimeWindow {
            after: Some("9am".to_string()),
            before: None,
            weekdays: None,
        }));
    }

    #[test]
    fn window_check_is_pure_over_instant_and_day() {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();

        assert!(check_time_window_at(
            Some("10:00:00"),
            Some("14:00:00"),
            None,
            noon,
            Weekday::Mon
        )
        .unwrap());
        assert!(!check_time_window_at(
            Some("22:00:00"),
            Some("06:00:00"),
            None,
            noon,
            Weekday::Mon
        )
        .unwrap());

        // Defaults span the whole day.
        assert!(check_time_window_at(None, None, None, noon, Weekday::Mon).unwrap());

        let weekend = vec!["sat".to_string(), "sun".to_string()];
        assert!(!check_time_window_at(None, None, Some(&weekend), noon, Weekday::Mon).unwrap());
        assert!(check_time_window_at(None, None, Some(&weekend), noon, Weekday::Sun).unwrap());
    }
}
