//! Declarative conditions over journey data.
//!
//! Conditions decide whether an optional step runs and which polic(ies) a
//! request may select. They are plain data so administrators can author
//! them as JSON alongside the policy; evaluation lives in the engine crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator for a single predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    /// Key's value equals the expected value.
    #[default]
    Equals,
    /// Key's value does not equal the expected value.
    NotEquals,
    /// Key's value (string or array) contains the expected value.
    ///
    /// Used for multi-value claims such as `acr` / `amr`.
    Contains,
    /// Key is present, whatever its value.
    Exists,
}

/// A single predicate over the journey data bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Data bag key the predicate inspects.
    pub key: String,
    /// Comparison operator.
    #[serde(default)]
    pub operator: ConditionOperator,
    /// Expected value (ignored for `Exists`).
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    /// Creates an equality predicate.
    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operator: ConditionOperator::Equals,
            value: value.into(),
        }
    }

    /// Creates a containment predicate.
    #[must_use]
    pub fn contains(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operator: ConditionOperator::Contains,
            value: value.into(),
        }
    }

    /// Creates an existence predicate.
    #[must_use]
    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: ConditionOperator::Exists,
            value: Value::Null,
        }
    }
}

/// A conjunction of predicates.
///
/// Empty sets evaluate to `true`, matching "no condition configured".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSet {
    /// Predicates that must all hold.
    #[serde(default)]
    pub all: Vec<Condition>,
}

impl ConditionSet {
    /// Creates a condition set from a list of predicates.
    #[must_use]
    pub fn new(all: Vec<Condition>) -> Self {
        Self { all }
    }

    /// Creates a set holding a single predicate.
    #[must_use]
    pub fn single(condition: Condition) -> Self {
        Self {
            all: vec![condition],
        }
    }

    /// Returns `true` when no predicates are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
