//! Outbound API invocation step.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};

use crate::services::{require, ApiGateway, ServiceError};

/// Calls a named gateway endpoint and merges the response into the claims.
///
/// Config: `endpoint` (required) and `include`, the list of data-bag keys
/// to send. The payload always carries `journeyId` and `tenantId` so the
/// remote side can correlate.
pub struct ApiCallHandler;

#[async_trait]
impl StepHandler for ApiCallHandler {
    fn step_type(&self) -> &'static str {
        "api-call"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let gateway = require::<dyn ApiGateway>(ctx, "ApiGateway")?;

        let endpoint = ctx.config_str("endpoint", "").to_string();
        if endpoint.is_empty() {
            return Ok(StepHandlerResult::fail(
                "step_misconfigured",
                "api-call step has no 'endpoint' configuration",
            ));
        }

        let mut payload: HashMap<String, Value> = HashMap::from([
            (
                "journeyId".to_string(),
                Value::String(ctx.journey_id.clone()),
            ),
            ("tenantId".to_string(), Value::String(ctx.tenant_id.clone())),
        ]);
        if let Some(include) = ctx.config_value("include").and_then(Value::as_array).cloned() {
            for key in include.iter().filter_map(Value::as_str) {
                if let Some(value) = ctx.get_data(key) {
                    payload.insert(key.to_string(), value.clone());
                }
            }
        }

        match gateway.invoke(&ctx.tenant_id, &endpoint, &payload).await {
            Ok(response) => Ok(StepHandlerResult::success_with(response)),
            Err(ServiceError::Rejected(reason)) => {
                tracing::debug!(endpoint = %endpoint, reason = %reason, "api call rejected");
                Ok(StepHandlerResult::fail(
                    "api_call_failed",
                    "the downstream call was rejected",
                ))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use oluso_model::StepDefinition;

    use crate::memory::StaticApiGateway;
    use crate::testutil::TestCtx;

    use super::*;

    #[tokio::test]
    async fn api_call_sends_selected_keys_and_merges_response() {
        let gateway = Arc::new(StaticApiGateway::new());
        gateway.respond(
            "risk-score",
            HashMap::from([("risk_level".to_string(), json!("low"))]),
        );

        let step = StepDefinition::new("a", "api-call", 1)
            .config("endpoint", "risk-score")
            .config("include", json!(["preferred_username"]));
        let mut ctx = TestCtx::new(step)
            .with::<dyn ApiGateway>(Arc::clone(&gateway) as Arc<dyn ApiGateway>)
            .data("preferred_username", "alice")
            .data("unrelated", "nope")
            .build();

        match ApiCallHandler.execute(&mut ctx).await.unwrap() {
            StepHandlerResult::Success { claims } => {
                assert_eq!(claims.get("risk_level"), Some(&json!("low")));
            }
            other => panic!("expected success, got {other:?}"),
        }

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.get("preferred_username"), Some(&json!("alice")));
        assert!(!calls[0].1.contains_key("unrelated"));
        assert!(calls[0].1.contains_key("journeyId"));
    }

    #[tokio::test]
    async fn unknown_endpoint_fails_journey() {
        let step = StepDefinition::new("a", "api-call", 1).config("endpoint", "nope");
        let mut ctx = TestCtx::new(step)
            .with::<dyn ApiGateway>(Arc::new(StaticApiGateway::new()))
            .build();
        assert!(ApiCallHandler.execute(&mut ctx).await.unwrap().is_fail());
    }
}
