//! Credential and brokered login handlers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};

use crate::services::{require, ExternalIdentityProvider, ServiceError, UserService};

const ATTEMPTS_KEY: &str = "login_attempts";

/// Username/password login against the tenant directory.
///
/// Failed attempts are counted in the journey data bag; once the configured
/// `maxAttempts` (default 3) is reached the journey fails with
/// `invalid_credentials`. The error shown to the user never reveals whether
/// the account exists.
pub struct LocalLoginHandler;

#[async_trait]
impl StepHandler for LocalLoginHandler {
    fn step_type(&self) -> &'static str {
        "local-login"
    }

    fn display_name(&self) -> &'static str {
        "Username and password"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let users = require::<dyn UserService>(ctx, "UserService")?;

        let (Some(username), Some(password)) = (ctx.value("username"), ctx.value("password"))
        else {
            return Ok(StepHandlerResult::show_ui(
                "login",
                json!({ "fields": ["username", "password"] }),
            ));
        };
        let (username, password) = (username.to_string(), password.to_string());

        if let Some(user) = users
            .verify_credentials(&ctx.tenant_id, &username, &password)
            .await?
        {
            let claims = HashMap::from([
                ("sub".to_string(), Value::String(user.id)),
                (
                    "preferred_username".to_string(),
                    Value::String(user.username),
                ),
                (
                    "authenticated_at".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                ),
            ]);
            return Ok(StepHandlerResult::success_with(claims));
        }

        let attempts = ctx
            .get_data(ATTEMPTS_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(0)
            + 1;
        ctx.set_data(ATTEMPTS_KEY, attempts);

        let max_attempts = ctx.config_i64("maxAttempts", 3);
        if attempts >= max_attempts {
            return Ok(StepHandlerResult::fail(
                "invalid_credentials",
                "the username or password is incorrect",
            ));
        }
        Ok(StepHandlerResult::show_ui(
            "login",
            json!({
                "fields": ["username", "password"],
                "error": "invalid_credentials",
                "attemptsRemaining": max_attempts - attempts,
            }),
        ))
    }
}

/// Login-method chooser.
///
/// Renders the configured `methods` (default `local` and `external`) and
/// branches on the submitted action, so the policy maps each outcome to its
/// own sub-flow.
pub struct CompositeLoginHandler;

#[async_trait]
impl StepHandler for CompositeLoginHandler {
    fn step_type(&self) -> &'static str {
        "composite-login"
    }

    fn display_name(&self) -> &'static str {
        "Login method chooser"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let methods: Vec<String> = ctx
            .config_value("methods")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["local".to_string(), "external".to_string()]);

        if let Some(action) = ctx.action.clone() {
            if methods.iter().any(|method| *method == action) {
                return Ok(StepHandlerResult::branch(action));
            }
        }
        Ok(StepHandlerResult::show_ui(
            "login_chooser",
            json!({ "methods": methods }),
        ))
    }
}

/// Brokered login against an upstream identity provider.
///
/// First pass shows the `external_redirect` view carrying the provider's
/// authorization URL; the callback continues the journey with a `code`
/// value, which is exchanged for the asserted identity.
pub struct ExternalLoginHandler;

#[async_trait]
impl StepHandler for ExternalLoginHandler {
    fn step_type(&self) -> &'static str {
        "external-login"
    }

    fn display_name(&self) -> &'static str {
        "External identity provider"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let idp = require::<dyn ExternalIdentityProvider>(ctx, "ExternalIdentityProvider")?;
        let provider = ctx.config_str("provider", "default").to_string();

        let Some(code) = ctx.value("code").map(str::to_string) else {
            let url = idp
                .authorization_url(&ctx.tenant_id, &provider, &ctx.journey_id)
                .await?;
            return Ok(StepHandlerResult::show_ui(
                "external_redirect",
                json!({ "provider": provider, "redirectUrl": url }),
            ));
        };

        let identity = match idp.exchange_code(&ctx.tenant_id, &provider, &code).await {
            Ok(identity) => identity,
            Err(ServiceError::Rejected(reason)) => {
                tracing::debug!(provider = %provider, reason = %reason, "code exchange rejected");
                return Ok(StepHandlerResult::fail(
                    "external_login_failed",
                    "sign-in with the external provider failed",
                ));
            }
            Err(err) => return Err(err.into()),
        };

        let mut claims = identity.claims;
        claims.insert(
            "external_provider".to_string(),
            Value::String(identity.provider),
        );
        claims.insert(
            "external_id".to_string(),
            Value::String(identity.external_id),
        );
        claims.insert(
            "authenticated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        Ok(StepHandlerResult::success_with(claims))
    }
}

/// Links the external identity collected earlier in the journey to the
/// bound user.
pub struct LinkAccountHandler;

#[async_trait]
impl StepHandler for LinkAccountHandler {
    fn step_type(&self) -> &'static str {
        "link-account"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let users = require::<dyn UserService>(ctx, "UserService")?;

        let (Some(user_id), Some(provider), Some(external_id)) = (
            ctx.user_id.clone(),
            ctx.data_str("external_provider").map(str::to_string),
            ctx.data_str("external_id").map(str::to_string),
        ) else {
            return Ok(StepHandlerResult::fail(
                "link_failed",
                "no external identity available to link",
            ));
        };

        match users
            .link_external_identity(&ctx.tenant_id, &user_id, &provider, &external_id)
            .await
        {
            Ok(()) => Ok(StepHandlerResult::success_with(HashMap::from([(
                "account_linked".to_string(),
                Value::Bool(true),
            )]))),
            Err(ServiceError::Rejected(reason) | ServiceError::Backend(reason)) => {
                tracing::debug!(reason = %reason, "account link rejected");
                Ok(StepHandlerResult::fail(
                    "link_failed",
                    "the account could not be linked",
                ))
            }
            Err(ServiceError::UserNotFound) => Ok(StepHandlerResult::fail(
                "link_failed",
                "the account could not be linked",
            )),
        }
    }
}
