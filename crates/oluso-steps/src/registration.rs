//! Self-registration handlers.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};

use crate::services::{require, NewUser, ServiceError, UserService};

const PENDING_KEY: &str = "pending_registration";

fn configured_fields(ctx: &StepContext, default: &[&str]) -> Vec<String> {
    ctx.config_value("fields")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_else(|| default.iter().map(|field| (*field).to_string()).collect())
}

/// Collects a registration form and stashes it in the data bag.
///
/// The actual user record is materialized later by `create-user`, so a
/// policy can interleave verification steps (captcha, email code) between
/// collection and creation. Config: `fields` (default `username`, `email`,
/// `password`).
pub struct SignUpHandler;

#[async_trait]
impl StepHandler for SignUpHandler {
    fn step_type(&self) -> &'static str {
        "sign-up"
    }

    fn display_name(&self) -> &'static str {
        "Registration form"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let fields = configured_fields(ctx, &["username", "email", "password"]);

        if !ctx.has_input() {
            return Ok(StepHandlerResult::show_ui(
                "sign_up",
                json!({ "fields": fields }),
            ));
        }

        let missing: Vec<&String> = fields
            .iter()
            .filter(|field| ctx.value(field).map_or(true, str::is_empty))
            .collect();
        if !missing.is_empty() {
            return Ok(StepHandlerResult::show_ui(
                "sign_up",
                json!({ "fields": fields, "error": "missing_fields", "missing": missing }),
            ));
        }

        let mut pending = Map::new();
        for field in &fields {
            if let Some(value) = ctx.value(field) {
                pending.insert(field.clone(), Value::String(value.to_string()));
            }
        }
        ctx.set_data(PENDING_KEY, Value::Object(pending));
        Ok(StepHandlerResult::success())
    }
}

/// Materializes the pending registration through the user service.
///
/// Scrubs the stash (password included) from the data bag afterwards, then
/// emits the new user's `sub`.
pub struct CreateUserHandler;

#[async_trait]
impl StepHandler for CreateUserHandler {
    fn step_type(&self) -> &'static str {
        "create-user"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let users = require::<dyn UserService>(ctx, "UserService")?;

        let Some(pending) = ctx.get_data(PENDING_KEY).and_then(Value::as_object).cloned()
        else {
            return Ok(StepHandlerResult::fail(
                "registration_failed",
                "no pending registration to create",
            ));
        };

        let field = |key: &str| pending.get(key).and_then(Value::as_str).map(str::to_string);
        let Some(username) = field("username") else {
            return Ok(StepHandlerResult::fail(
                "registration_failed",
                "the registration is incomplete",
            ));
        };
        let known = ["username", "email", "phone", "password"];
        let attributes: HashMap<String, Value> = pending
            .iter()
            .filter(|(key, _)| !known.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let new_user = NewUser {
            username,
            email: field("email"),
            phone: field("phone"),
            password: field("password"),
            attributes,
        };

        ctx.set_data(PENDING_KEY, Value::Null);

        match users.create_user(&ctx.tenant_id, new_user).await {
            Ok(user) => Ok(StepHandlerResult::success_with(HashMap::from([
                ("sub".to_string(), Value::String(user.id)),
                (
                    "preferred_username".to_string(),
                    Value::String(user.username),
                ),
            ]))),
            Err(ServiceError::Rejected(reason)) => {
                tracing::debug!(reason = %reason, "registration rejected");
                Ok(StepHandlerResult::fail(
                    "registration_failed",
                    "the account could not be created",
                ))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Writes configured attribute mappings from the data bag onto the bound
/// user.
///
/// Config `attributes` maps attribute names to data-bag keys, e.g.
/// `{ "locale": "preferred_locale" }`. Missing source keys are skipped.
pub struct UpdateUserHandler;

#[async_trait]
impl StepHandler for UpdateUserHandler {
    fn step_type(&self) -> &'static str {
        "update-user"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let users = require::<dyn UserService>(ctx, "UserService")?;

        let Some(user_id) = ctx.user_id.clone() else {
            return Ok(StepHandlerResult::fail(
                "update_failed",
                "no authenticated user to update",
            ));
        };
        let Some(mappings) = ctx.config_value("attributes").and_then(Value::as_object).cloned()
        else {
            return Ok(StepHandlerResult::fail(
                "update_failed",
                "no attribute mappings configured",
            ));
        };

        let mut attributes = HashMap::new();
        for (attribute, source) in &mappings {
            let Some(source_key) = source.as_str() else {
                continue;
            };
            if let Some(value) = ctx.get_data(source_key) {
                attributes.insert(attribute.clone(), value.clone());
            }
        }

        users
            .update_attributes(&ctx.tenant_id, &user_id, attributes)
            .await?;
        Ok(StepHandlerResult::success())
    }
}
