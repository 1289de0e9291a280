//! Custom plugin step.
//!
//! Tenant-supplied logic runs behind the [`PluginExecutor`] boundary and
//! speaks a small camelCase JSON protocol. The in-process
//! [`ManagedPluginExecutor`] dispatches to registered [`ManagedPlugin`]
//! trait objects; a sandboxed (e.g. WASM) runtime implements the same trait
//! without the handler noticing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};

use crate::services::{require, ServiceError, ServiceResult};

/// Actions a plugin may request.
pub mod actions {
    /// Step succeeded; merge `data` as claims and advance.
    pub const CONTINUE: &str = "continue";
    /// Step failed; terminate the journey.
    pub const FAIL: &str = "fail";
    /// More input needed; pause and render.
    pub const REQUIRE_INPUT: &str = "require_input";
    /// Branch to the outcome named by `branchId` in `data`.
    pub const BRANCH: &str = "branch";
}

/// Request handed to a plugin invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRequest {
    /// Entry point to invoke.
    pub function: String,
    /// The bound user, if any.
    pub user_id: Option<String>,
    /// Tenant the journey belongs to.
    pub tenant_id: String,
    /// Submitted form values.
    pub input: HashMap<String, String>,
    /// The journey data bag.
    pub journey_data: HashMap<String, Value>,
}

/// Response returned by a plugin invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginResponse {
    /// Whether the invocation itself succeeded.
    pub success: bool,
    /// Error message when `success` is false or `action` is `fail`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Requested action; absent means `continue`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Action payload: claims for `continue`/`branch`, view model for
    /// `require_input`, `branchId` for `branch`.
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

impl PluginResponse {
    /// A successful `continue` response carrying claims.
    #[must_use]
    pub fn proceed(data: HashMap<String, Value>) -> Self {
        Self {
            success: true,
            error: None,
            action: Some(actions::CONTINUE.to_string()),
            data,
        }
    }

    /// A `fail` response with an error message.
    #[must_use]
    pub fn denied(error: impl Into<String>) -> Self {
        Self {
            success: true,
            error: Some(error.into()),
            action: Some(actions::FAIL.to_string()),
            data: HashMap::new(),
        }
    }
}

/// Executes plugin invocations for a tenant.
#[async_trait]
pub trait PluginExecutor: Send + Sync {
    /// Runs one invocation of the identified plugin.
    async fn execute(&self, plugin_id: &str, request: &PluginRequest)
        -> ServiceResult<PluginResponse>;
}

/// A plugin hosted in-process.
#[async_trait]
pub trait ManagedPlugin: Send + Sync {
    /// Identifier the policy configuration refers to.
    fn plugin_id(&self) -> &'static str;

    /// Handles one invocation.
    async fn handle(&self, request: &PluginRequest) -> ServiceResult<PluginResponse>;
}

/// In-process [`PluginExecutor`] over registered [`ManagedPlugin`]s.
#[derive(Default)]
pub struct ManagedPluginExecutor {
    plugins: DashMap<&'static str, Arc<dyn ManagedPlugin>>,
}

impl ManagedPluginExecutor {
    /// Creates an executor with no plugins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin; a later registration under the same ID replaces
    /// the earlier one.
    pub fn register(&self, plugin: Arc<dyn ManagedPlugin>) {
        self.plugins.insert(plugin.plugin_id(), plugin);
    }
}

impl std::fmt::Debug for ManagedPluginExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.plugins.iter().map(|entry| *entry.key()).collect();
        f.debug_struct("ManagedPluginExecutor")
            .field("plugins", &ids)
            .finish()
    }
}

#[async_trait]
impl PluginExecutor for ManagedPluginExecutor {
    async fn execute(
        &self,
        plugin_id: &str,
        request: &PluginRequest,
    ) -> ServiceResult<PluginResponse> {
        let Some(plugin) = self.plugins.get(plugin_id).map(|entry| Arc::clone(&entry)) else {
            return Err(ServiceError::Rejected(format!(
                "no plugin registered under '{plugin_id}'"
            )));
        };
        plugin.handle(request).await
    }
}

/// Delegates the step to a tenant plugin.
///
/// Config: `pluginId` (required) and `function` (default `handle`). The
/// plugin's response maps onto the step-result vocabulary one to one.
pub struct CustomPluginHandler;

#[async_trait]
impl StepHandler for CustomPluginHandler {
    fn step_type(&self) -> &'static str {
        "custom-plugin"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let executor = require::<dyn PluginExecutor>(ctx, "PluginExecutor")?;

        let plugin_id = ctx.config_str("pluginId", "").to_string();
        if plugin_id.is_empty() {
            return Ok(StepHandlerResult::fail(
                "step_misconfigured",
                "custom-plugin step has no 'pluginId' configuration",
            ));
        }

        let request = PluginRequest {
            function: ctx.config_str("function", "handle").to_string(),
            user_id: ctx.user_id.clone(),
            tenant_id: ctx.tenant_id.clone(),
            input: ctx.values.clone(),
            journey_data: ctx.data.clone(),
        };

        let response = match executor.execute(&plugin_id, &request).await {
            Ok(response) => response,
            Err(ServiceError::Rejected(reason)) => {
                tracing::error!(plugin_id = %plugin_id, reason = %reason, "plugin unavailable");
                return Ok(StepHandlerResult::fail(
                    "plugin_error",
                    "the custom step is unavailable",
                ));
            }
            Err(err) => return Err(err.into()),
        };

        if !response.success {
            tracing::debug!(plugin_id = %plugin_id, error = ?response.error, "plugin reported failure");
            return Ok(StepHandlerResult::fail(
                "plugin_error",
                response
                    .error
                    .unwrap_or_else(|| "the custom step failed".to_string()),
            ));
        }

        let mut data = response.data;
        match response.action.as_deref().unwrap_or(actions::CONTINUE) {
            actions::CONTINUE => Ok(StepHandlerResult::success_with(data)),
            actions::FAIL => Ok(StepHandlerResult::fail(
                data.get("code")
                    .and_then(Value::as_str)
                    .unwrap_or("plugin_rejected"),
                response
                    .error
                    .unwrap_or_else(|| "the custom step rejected the request".to_string()),
            )),
            actions::REQUIRE_INPUT => {
                let view = data
                    .get("view")
                    .and_then(Value::as_str)
                    .unwrap_or("plugin")
                    .to_string();
                Ok(StepHandlerResult::show_ui(view, json!(data)))
            }
            actions::BRANCH => {
                let Some(outcome) = data
                    .remove("branchId")
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(str::to_string)
                else {
                    return Ok(StepHandlerResult::fail(
                        "plugin_error",
                        "branch response carried no branchId",
                    ));
                };
                Ok(StepHandlerResult::branch_with(outcome, data))
            }
            other => {
                tracing::error!(plugin_id = %plugin_id, action = %other, "unknown plugin action");
                Ok(StepHandlerResult::fail(
                    "plugin_error",
                    "the custom step returned an unknown action",
                ))
            }
        }
    }
}
