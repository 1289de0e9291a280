//! Consent, terms, and challenge handlers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};

use crate::services::{require, CaptchaVerifier};

/// Scope consent prompt.
///
/// Shows the scopes configured under `scopes`; the `granted` action records
/// them as claims, the `denied` action fails the journey with
/// `consent_denied`.
pub struct ConsentHandler;

#[async_trait]
impl StepHandler for ConsentHandler {
    fn step_type(&self) -> &'static str {
        "consent"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let scopes = ctx
            .config_value("scopes")
            .cloned()
            .unwrap_or_else(|| json!([]));

        if ctx.is_action("granted") {
            return Ok(StepHandlerResult::success_with(HashMap::from([
                ("consented_scopes".to_string(), scopes),
                (
                    "consented_at".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                ),
            ])));
        }
        if ctx.is_action("denied") {
            return Ok(StepHandlerResult::fail(
                "consent_denied",
                "the user declined the requested access",
            ));
        }
        Ok(StepHandlerResult::show_ui(
            "consent",
            json!({ "scopes": scopes }),
        ))
    }
}

/// Terms-of-service acceptance.
///
/// Config `termsUrl` and `version`; acceptance is recorded as the
/// `terms_accepted_version` claim, declining fails with `terms_declined`.
pub struct TermsAcceptanceHandler;

#[async_trait]
impl StepHandler for TermsAcceptanceHandler {
    fn step_type(&self) -> &'static str {
        "terms-acceptance"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let version = ctx.config_str("version", "1").to_string();

        if ctx.is_action("accept") {
            return Ok(StepHandlerResult::success_with(HashMap::from([(
                "terms_accepted_version".to_string(),
                Value::String(version),
            )])));
        }
        if ctx.is_action("decline") {
            return Ok(StepHandlerResult::fail(
                "terms_declined",
                "the terms of service were declined",
            ));
        }
        Ok(StepHandlerResult::show_ui(
            "terms",
            json!({
                "termsUrl": ctx.config_str("termsUrl", ""),
                "version": version,
            }),
        ))
    }
}

/// Bot-challenge verification through a [`CaptchaVerifier`].
///
/// Retries up to `maxAttempts` (default 3), then fails the journey with
/// `captcha_failed`.
pub struct CaptchaHandler;

const ATTEMPTS_KEY: &str = "captcha_attempts";

#[async_trait]
impl StepHandler for CaptchaHandler {
    fn step_type(&self) -> &'static str {
        "captcha"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let verifier = require::<dyn CaptchaVerifier>(ctx, "CaptchaVerifier")?;

        let Some(token) = ctx.value("captchaToken").map(str::to_string) else {
            return Ok(StepHandlerResult::show_ui("captcha", json!({})));
        };

        if verifier.verify(&ctx.tenant_id, &token).await? {
            return Ok(StepHandlerResult::success_with(HashMap::from([(
                "captcha_verified".to_string(),
                Value::Bool(true),
            )])));
        }

        let attempts = ctx
            .get_data(ATTEMPTS_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(0)
            + 1;
        ctx.set_data(ATTEMPTS_KEY, attempts);
        if attempts >= ctx.config_i64("maxAttempts", 3) {
            return Ok(StepHandlerResult::fail(
                "captcha_failed",
                "the challenge could not be verified",
            ));
        }
        Ok(StepHandlerResult::show_ui(
            "captcha",
            json!({ "error": "captcha_failed" }),
        ))
    }
}
