//! Compiles raw rule definitions into the validated, indexed form

use crate::config::{OneOrMany, RawAction, RawCondition, RawTrigger, RuleDefinition, RuleSet};
use crate::error::RuleError;
use crate::model::{
    ActionSpec, CompiledRule, ConditionSpec, RuleId, RuleIndex, Service, TriggerSpec,
};
use hub_core::EntityId;
use std::time::Duration;

/// Default attribute watched by state triggers and conditions.
const STATE_ATTRIBUTE: &str = "state";

/// Compile a rule set into the per-entity index.
///
/// Validation is all-or-nothing per rule: any invalid trigger, action or
/// condition drops the whole rule with a warning, and compilation
/// continues with the remaining rules. Accepted rules get a fresh id and
/// are registered under every entity their trigger names.
#[must_use]
pub fn compile(rules: &RuleSet) -> RuleIndex {
    let mut index = RuleIndex::default();
    for (name, definition) in rules {
        match compile_rule(name, definition) {
            Ok(rule) => {
                tracing::debug!("Compiled rule '{}' ({})", name, rule.id);
                index.insert(rule);
            }
            Err(error) => {
                tracing::warn!("Config validation error in rule '{}': {}", name, error);
            }
        }
    }
    tracing::info!("Compiled {} rule(s)", index.len());
    index
}

fn compile_rule(name: &str, definition: &RuleDefinition) -> Result<CompiledRule, RuleError> {
    let trigger = compile_trigger(&definition.trigger)?;
    let actions = definition
        .action
        .clone()
        .into_vec()
        .iter()
        .map(compile_action)
        .collect::<Result<Vec<_>, _>>()?;
    let conditions = match &definition.condition {
        Some(conditions) => conditions
            .clone()
            .into_vec()
            .iter()
            .map(compile_condition)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(CompiledRule {
        id: RuleId::generate(),
        name: name.to_string(),
        trigger,
        conditions,
        actions,
    })
}

fn compile_trigger(raw: &RawTrigger) -> Result<TriggerSpec, RuleError> {
    let debounce = raw.debounce.filter(|seconds| *seconds > 0).map(Duration::from_secs);

    match raw.platform.as_str() {
        "action" => {
            let entities = trigger_entities(raw)?;
            let actions = raw
                .action
                .clone()
                .map(OneOrMany::into_vec)
                .unwrap_or_default();
            if actions.is_empty() {
                return Err(RuleError::InvalidTrigger(
                    "action trigger without action names".to_string(),
                ));
            }
            Ok(TriggerSpec::Action {
                entities,
                actions,
                debounce,
            })
        }
        "state" => {
            let entities = trigger_entities(raw)?;
            let values = raw
                .state
                .clone()
                .map(OneOrMany::into_vec)
                .unwrap_or_default();
            if values.is_empty() {
                return Err(RuleError::InvalidTrigger(
                    "state trigger without state values".to_string(),
                ));
            }
            Ok(TriggerSpec::State {
                entities,
                attribute: attribute_or_default(&raw.attribute),
                values,
                debounce,
            })
        }
        "numeric_state" => {
            let entities = trigger_entities(raw)?;
            let attribute = raw.attribute.clone().ok_or_else(|| {
                RuleError::InvalidTrigger("numeric_state trigger without attribute".to_string())
            })?;
            Ok(TriggerSpec::NumericState {
                entities,
                attribute,
                above: raw.above,
                below: raw.below,
                debounce,
            })
        }
        other => Err(RuleError::InvalidTrigger(format!(
            "unknown trigger platform '{other}'"
        ))),
    }
}

fn trigger_entities(raw: &RawTrigger) -> Result<Vec<EntityId>, RuleError> {
    let entities: Vec<EntityId> = raw
        .entity
        .clone()
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(EntityId::from)
        .collect();
    if entities.is_empty() {
        return Err(RuleError::InvalidTrigger(
            "trigger entity not specified".to_string(),
        ));
    }
    Ok(entities)
}

fn compile_action(raw: &RawAction) -> Result<ActionSpec, RuleError> {
    let service = match raw.service.as_str() {
        "turn_on" => Service::TurnOn,
        "turn_off" => Service::TurnOff,
        "toggle" => Service::Toggle,
        "custom" => Service::Custom,
        other => {
            return Err(RuleError::InvalidAction(format!(
                "unknown service '{other}'"
            )))
        }
    };
    Ok(ActionSpec {
        entity: EntityId::from(raw.entity.as_str()),
        service,
        data: raw.data.clone(),
    })
}

fn compile_condition(raw: &RawCondition) -> Result<ConditionSpec, RuleError> {
    match raw.platform.as_str() {
        "time" => Ok(ConditionSpec::TimeWindow {
            after: raw.after.clone(),
            before: raw.before.clone(),
            weekdays: raw.weekday.clone().map(OneOrMany::into_vec),
        }),
        "state" => {
            let entity = condition_entity(raw)?;
            let value = raw.state.clone().ok_or_else(|| {
                RuleError::InvalidCondition("state condition without expected value".to_string())
            })?;
            Ok(ConditionSpec::State {
                entity,
                attribute: attribute_or_default(&raw.attribute),
                value,
            })
        }
        "numeric_state" => {
            let entity = condition_entity(raw)?;
            let attribute = raw.attribute.clone().ok_or_else(|| {
                RuleError::InvalidCondition("numeric_state condition without attribute".to_string())
            })?;
            Ok(ConditionSpec::NumericState {
                entity,
                attribute,
                above: raw.above,
                below: raw.below,
            })
        }
        other => Err(RuleError::InvalidCondition(format!(
            "unknown condition platform '{other}'"
        ))),
    }
}

fn condition_entity(raw: &RawCondition) -> Result<EntityId, RuleError> {
    raw.entity.as_deref().map(EntityId::from).ok_or_else(|| {
        RuleError::InvalidCondition("condition entity not specified".to_string())
    })
}

fn attribute_or_default(attribute: &Option<String>) -> String {
    attribute
        .clone()
        .unwrap_or_else(|| STATE_ATTRIBUTE.to_string())
}
