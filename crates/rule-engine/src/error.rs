//! Error types for the rule engine

use hub_core::EntityId;
use thiserror::Error;

/// Errors raised while compiling or evaluating rules.
///
/// None of these are fatal to the host: compile-time errors drop the
/// offending rule, runtime errors fail open or skip the offending action.
#[derive(Error, Debug)]
pub enum RuleError {
    /// Invalid trigger configuration
    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    /// Invalid condition configuration
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Invalid action configuration
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Invalid time-of-day string
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// Referenced entity is unknown
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),
}
