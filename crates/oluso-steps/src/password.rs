//! Password recovery and change handlers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use oluso_core::random_alphanumeric;
use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};

use crate::services::{require, MessageChannel, MessageSender, OutboundMessage, ServiceError, UserService};

/// Starts account recovery: collects an identifier and dispatches a reset
/// message when it resolves to an account.
///
/// Always succeeds with the same claims, so the outcome never reveals
/// whether the identifier exists. The journey does not bind a user; the
/// reset link itself carries the token.
pub struct PasswordResetHandler;

#[async_trait]
impl StepHandler for PasswordResetHandler {
    fn step_type(&self) -> &'static str {
        "password-reset"
    }

    fn display_name(&self) -> &'static str {
        "Password reset request"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let users = require::<dyn UserService>(ctx, "UserService")?;
        let sender = require::<dyn MessageSender>(ctx, "MessageSender")?;

        let Some(identifier) = ctx.value("identifier").map(str::to_string) else {
            return Ok(StepHandlerResult::show_ui(
                "password_reset",
                json!({ "fields": ["identifier"] }),
            ));
        };

        if let Some(user) = users.find_by_identifier(&ctx.tenant_id, &identifier).await? {
            if let Some(email) = user.email {
                let token = random_alphanumeric(32);
                sender
                    .send(
                        &ctx.tenant_id,
                        &OutboundMessage {
                            recipient: email,
                            channel: MessageChannel::Email,
                            template: "password_reset".to_string(),
                            variables: HashMap::from([("token".to_string(), token)]),
                        },
                    )
                    .await?;
            }
        }

        // Identical result whether or not the account exists.
        Ok(StepHandlerResult::success_with(HashMap::from([(
            "reset_requested".to_string(),
            Value::Bool(true),
        )])))
    }
}

/// Sets a new password for the bound user.
///
/// Validates the confirmation field and a configurable minimum length
/// (`minLength`, default 8) before delegating to the directory, which
/// enforces the tenant password policy.
pub struct PasswordChangeHandler;

#[async_trait]
impl StepHandler for PasswordChangeHandler {
    fn step_type(&self) -> &'static str {
        "password-change"
    }

    fn display_name(&self) -> &'static str {
        "Change password"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let users = require::<dyn UserService>(ctx, "UserService")?;

        let Some(user_id) = ctx.user_id.clone() else {
            return Ok(StepHandlerResult::fail(
                "password_change_failed",
                "no authenticated user",
            ));
        };

        let (Some(password), Some(confirm)) = (ctx.value("password"), ctx.value("confirm")) else {
            return Ok(StepHandlerResult::show_ui(
                "password_change",
                json!({ "fields": ["password", "confirm"] }),
            ));
        };
        let password = password.to_string();

        if password != confirm {
            return Ok(StepHandlerResult::show_ui(
                "password_change",
                json!({ "fields": ["password", "confirm"], "error": "password_mismatch" }),
            ));
        }
        let min_length = usize::try_from(ctx.config_i64("minLength", 8)).unwrap_or(8);
        if password.chars().count() < min_length {
            return Ok(StepHandlerResult::show_ui(
                "password_change",
                json!({
                    "fields": ["password", "confirm"],
                    "error": "password_too_short",
                    "minLength": min_length,
                }),
            ));
        }

        match users.set_password(&ctx.tenant_id, &user_id, &password).await {
            Ok(()) => Ok(StepHandlerResult::success_with(HashMap::from([(
                "password_changed_at".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            )]))),
            Err(ServiceError::Rejected(reason)) => {
                tracing::debug!(reason = %reason, "password rejected by policy");
                Ok(StepHandlerResult::show_ui(
                    "password_change",
                    json!({ "fields": ["password", "confirm"], "error": "password_rejected" }),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }
}
