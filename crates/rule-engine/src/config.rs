//! Raw rule definitions as authored in configuration
//!
//! These types fix the wire shape only; reading them from disk is the
//! host's concern. Platforms and services are plain strings here and are
//! validated by the compiler, so a single bad rule never fails the whole
//! document.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Top-level configuration: rule name → definition, in authoring order.
pub type RuleSet = IndexMap<String, RuleDefinition>;

/// A single value or a list of values; config accepts both spellings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

/// One rule as authored. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDefinition {
    pub trigger: RawTrigger,
    pub action: OneOrMany<RawAction>,
    #[serde(default)]
    pub condition: Option<OneOrMany<RawCondition>>,
}

/// Trigger as authored; `platform` selects the variant and the remaining
/// fields are validated per platform by the compiler.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrigger {
    pub platform: String,
    #[serde(default)]
    pub entity: Option<OneOrMany<String>>,
    /// Discrete event names, for `action` triggers.
    #[serde(default)]
    pub action: Option<OneOrMany<String>>,
    /// Monitored values, for `state` triggers.
    #[serde(default)]
    pub state: Option<OneOrMany<String>>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub above: Option<f64>,
    #[serde(default)]
    pub below: Option<f64>,
    /// Debounce duration in seconds.
    #[serde(default, rename = "for")]
    pub debounce: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAction {
    pub entity: String,
    pub service: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCondition {
    pub platform: String,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub above: Option<f64>,
    #[serde(default)]
    pub below: Option<f64>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub weekday: Option<OneOrMany<String>>,
}
