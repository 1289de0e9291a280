//! Condition evaluation.
//!
//! Pure functions over the journey data bag. Evaluation has no side
//! effects, and a missing key makes the predicate false rather than an
//! error; an absent claim simply does not satisfy anything.

use std::collections::HashMap;

use serde_json::Value;

use oluso_model::{Condition, ConditionOperator, ConditionSet};

/// Evaluates a single predicate against the data bag.
#[must_use]
pub fn evaluate(condition: &Condition, data: &HashMap<String, Value>) -> bool {
    let Some(actual) = data.get(&condition.key) else {
        // Exists is false on a missing key like everything else.
        return false;
    };

    match condition.operator {
        ConditionOperator::Exists => true,
        ConditionOperator::Equals => *actual == condition.value,
        ConditionOperator::NotEquals => *actual != condition.value,
        ConditionOperator::Contains => contains(actual, &condition.value),
    }
}

/// Evaluates a conjunction of predicates.
///
/// An empty set is vacuously true ("no condition configured").
#[must_use]
pub fn evaluate_set(set: &ConditionSet, data: &HashMap<String, Value>) -> bool {
    set.all.iter().all(|condition| evaluate(condition, data))
}

/// Containment for multi-value claims.
///
/// - array: true when any element equals the expected value
/// - string: true when the expected string is a substring
fn contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| item == expected),
        Value::String(s) => expected.as_str().is_some_and(|needle| s.contains(needle)),
        _ => false,
    }
}
