//! Zero-UI control-flow handlers.
//!
//! These never render a view; each one completes in the same request it
//! starts, so the orchestrator chains straight through them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use oluso_journey::condition::evaluate_set;
use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};
use oluso_model::ConditionSet;

/// Evaluates the `when` condition set against the data bag and branches on
/// `"true"` or `"false"`; the policy maps those outcomes wherever it wants.
pub struct ConditionHandler;

#[async_trait]
impl StepHandler for ConditionHandler {
    fn step_type(&self) -> &'static str {
        "condition"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let Some(raw) = ctx.config_value("when").cloned() else {
            return Ok(StepHandlerResult::fail(
                "step_misconfigured",
                "condition step has no 'when' configuration",
            ));
        };
        let set: ConditionSet = match serde_json::from_value(raw) {
            Ok(set) => set,
            Err(err) => {
                tracing::error!(step_id = %ctx.step.id, error = %err, "unparseable condition set");
                return Ok(StepHandlerResult::fail(
                    "step_misconfigured",
                    "condition step configuration is invalid",
                ));
            }
        };

        let outcome = if evaluate_set(&set, &ctx.data) {
            "true"
        } else {
            "false"
        };
        Ok(StepHandlerResult::branch(outcome))
    }
}

/// Branches on the string value of a data-bag key (config `key`), with
/// `"default"` as the outcome for a missing or non-string value.
pub struct BranchHandler;

#[async_trait]
impl StepHandler for BranchHandler {
    fn step_type(&self) -> &'static str {
        "branch"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let key = ctx.config_str("key", "").to_string();
        if key.is_empty() {
            return Ok(StepHandlerResult::fail(
                "step_misconfigured",
                "branch step has no 'key' configuration",
            ));
        }
        let outcome = ctx
            .data_str(&key)
            .map_or_else(|| "default".to_string(), str::to_string);
        Ok(StepHandlerResult::branch(outcome))
    }
}

/// Rewrites the data bag: `set` inserts literal values, `copy` duplicates
/// existing keys under new names, `remove` overwrites keys with null.
///
/// Operations apply in that order and all come out as claims, so the
/// orchestrator's normal merge carries them into the bag.
pub struct TransformHandler;

#[async_trait]
impl StepHandler for TransformHandler {
    fn step_type(&self) -> &'static str {
        "transform"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let mut claims: HashMap<String, Value> = HashMap::new();

        if let Some(set) = ctx.config_value("set").and_then(Value::as_object) {
            for (key, value) in set {
                claims.insert(key.clone(), value.clone());
            }
        }
        if let Some(copy) = ctx.config_value("copy").and_then(Value::as_object).cloned() {
            for (target, source) in &copy {
                let Some(source_key) = source.as_str() else {
                    continue;
                };
                if let Some(value) = ctx.get_data(source_key) {
                    claims.insert(target.clone(), value.clone());
                }
            }
        }
        if let Some(remove) = ctx.config_value("remove").and_then(Value::as_array).cloned() {
            for key in remove.iter().filter_map(Value::as_str) {
                claims.insert(key.to_string(), Value::Null);
            }
        }

        Ok(StepHandlerResult::success_with(claims))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use oluso_model::StepDefinition;

    use crate::testutil::TestCtx;

    use super::*;

    #[tokio::test]
    async fn condition_branches_true_and_false() {
        let step = StepDefinition::new("c", "condition", 1).config(
            "when",
            json!({ "all": [{ "key": "mfa_enrolled", "operator": "equals", "value": true }] }),
        );

        let mut ctx = TestCtx::new(step.clone()).data("mfa_enrolled", true).build();
        match ConditionHandler.execute(&mut ctx).await.unwrap() {
            StepHandlerResult::Branch { outcome, .. } => assert_eq!(outcome, "true"),
            other => panic!("expected branch, got {other:?}"),
        }

        let mut ctx = TestCtx::new(step).build();
        match ConditionHandler.execute(&mut ctx).await.unwrap() {
            StepHandlerResult::Branch { outcome, .. } => assert_eq!(outcome, "false"),
            other => panic!("expected branch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn branch_reads_data_key_with_default() {
        let step = StepDefinition::new("b", "branch", 1).config("key", "journey_kind");

        let mut ctx = TestCtx::new(step.clone()).data("journey_kind", "signup").build();
        match BranchHandler.execute(&mut ctx).await.unwrap() {
            StepHandlerResult::Branch { outcome, .. } => assert_eq!(outcome, "signup"),
            other => panic!("expected branch, got {other:?}"),
        }

        let mut ctx = TestCtx::new(step).build();
        match BranchHandler.execute(&mut ctx).await.unwrap() {
            StepHandlerResult::Branch { outcome, .. } => assert_eq!(outcome, "default"),
            other => panic!("expected branch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transform_sets_copies_and_removes() {
        let step = StepDefinition::new("t", "transform", 1)
            .config("set", json!({ "acr": "urn:oluso:loa2" }))
            .config("copy", json!({ "login_hint": "preferred_username" }))
            .config("remove", json!(["pending_registration"]));

        let mut ctx = TestCtx::new(step)
            .data("preferred_username", "alice")
            .data("pending_registration", json!({ "password": "x" }))
            .build();
        match TransformHandler.execute(&mut ctx).await.unwrap() {
            StepHandlerResult::Success { claims } => {
                assert_eq!(claims.get("acr"), Some(&json!("urn:oluso:loa2")));
                assert_eq!(claims.get("login_hint"), Some(&json!("alice")));
                assert_eq!(claims.get("pending_registration"), Some(&Value::Null));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}
