//! One-time-code handlers: second-factor verification and passwordless
//! sign-in.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use oluso_journey::{EngineResult, StepContext, StepHandler, StepHandlerResult};

use crate::services::{
    require, MessageChannel, MessageSender, MfaService, OutboundMessage, UserService,
};

const CHALLENGE_KEY: &str = "mfa_challenge_id";
const ATTEMPTS_KEY: &str = "mfa_attempts";

const PW_CHALLENGE_KEY: &str = "passwordless_challenge_id";
const PW_USER_KEY: &str = "passwordless_user_id";
const PW_USERNAME_KEY: &str = "passwordless_username";
const PW_ATTEMPTS_KEY: &str = "passwordless_attempts";

fn code_message(recipient: &str, channel: MessageChannel, code: &str) -> OutboundMessage {
    OutboundMessage {
        recipient: recipient.to_string(),
        channel,
        template: "one_time_code".to_string(),
        variables: HashMap::from([("code".to_string(), code.to_string())]),
    }
}

/// Second-factor code verification for an already identified user.
///
/// A challenge is issued once per entry into the step (the challenge ID
/// lives in the data bag, so re-rendering never re-sends); the `resend`
/// action issues a fresh code. Config: `channel` (`email`, default, or
/// `sms`), `maxAttempts` (default 3).
pub struct MfaHandler;

impl MfaHandler {
    fn destination(ctx: &StepContext, channel: MessageChannel) -> Option<String> {
        let key = match channel {
            MessageChannel::Email => "email",
            MessageChannel::Sms => "phone",
        };
        ctx.data_str(key).map(str::to_string)
    }

    fn channel(ctx: &StepContext) -> MessageChannel {
        if ctx.config_str("channel", "email") == "sms" {
            MessageChannel::Sms
        } else {
            MessageChannel::Email
        }
    }
}

#[async_trait]
impl StepHandler for MfaHandler {
    fn step_type(&self) -> &'static str {
        "mfa"
    }

    fn display_name(&self) -> &'static str {
        "One-time code verification"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let mfa = require::<dyn MfaService>(ctx, "MfaService")?;
        let sender = require::<dyn MessageSender>(ctx, "MessageSender")?;

        let Some(user_id) = ctx.user_id.clone() else {
            return Ok(StepHandlerResult::fail(
                "mfa_unavailable",
                "no authenticated user to challenge",
            ));
        };
        let channel = Self::channel(ctx);
        let Some(destination) = Self::destination(ctx, channel) else {
            return Ok(StepHandlerResult::fail(
                "mfa_unavailable",
                "no delivery address on record",
            ));
        };

        let needs_challenge = ctx.get_data(CHALLENGE_KEY).is_none() || ctx.is_action("resend");
        if needs_challenge {
            let challenge = mfa.issue_challenge(&ctx.tenant_id, &user_id).await?;
            sender
                .send(
                    &ctx.tenant_id,
                    &code_message(&destination, channel, &challenge.code),
                )
                .await?;
            ctx.set_data(CHALLENGE_KEY, challenge.id);
            return Ok(StepHandlerResult::show_ui(
                "mfa",
                json!({ "channel": channel, "resent": ctx.is_action("resend") }),
            ));
        }

        let Some(code) = ctx.value("code").map(str::to_string) else {
            return Ok(StepHandlerResult::show_ui(
                "mfa",
                json!({ "channel": channel }),
            ));
        };
        let challenge_id = ctx
            .data_str(CHALLENGE_KEY)
            .map(str::to_string)
            .unwrap_or_default();

        if mfa.verify_code(&ctx.tenant_id, &challenge_id, &code).await? {
            return Ok(StepHandlerResult::success_with(HashMap::from([
                ("amr".to_string(), json!(["mfa"])),
                (
                    "mfa_verified_at".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                ),
            ])));
        }

        let attempts = ctx
            .get_data(ATTEMPTS_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(0)
            + 1;
        ctx.set_data(ATTEMPTS_KEY, attempts);
        if attempts >= ctx.config_i64("maxAttempts", 3) {
            return Ok(StepHandlerResult::fail(
                "invalid_code",
                "the code is incorrect",
            ));
        }
        Ok(StepHandlerResult::show_ui(
            "mfa",
            json!({ "channel": channel, "error": "invalid_code" }),
        ))
    }
}

/// Passwordless sign-in over a one-time code.
///
/// The user submits an identifier; if it resolves to an account, a code is
/// sent and its pending identity stashed in the data bag. The code view is
/// shown either way, so an attacker cannot probe which identifiers exist;
/// for unknown identifiers every code simply fails verification.
pub struct PasswordlessHandler {
    channel: MessageChannel,
}

impl PasswordlessHandler {
    /// Email-delivered codes; step type `passwordless-email`.
    #[must_use]
    pub const fn email() -> Self {
        Self {
            channel: MessageChannel::Email,
        }
    }

    /// SMS-delivered codes; step type `passwordless-sms`.
    #[must_use]
    pub const fn sms() -> Self {
        Self {
            channel: MessageChannel::Sms,
        }
    }

    fn identifier_view(&self, model: Value) -> StepHandlerResult {
        StepHandlerResult::show_ui("passwordless", model)
    }
}

#[async_trait]
impl StepHandler for PasswordlessHandler {
    fn step_type(&self) -> &'static str {
        match self.channel {
            MessageChannel::Email => "passwordless-email",
            MessageChannel::Sms => "passwordless-sms",
        }
    }

    fn display_name(&self) -> &'static str {
        "Passwordless sign-in"
    }

    async fn execute(&self, ctx: &mut StepContext) -> EngineResult<StepHandlerResult> {
        let users = require::<dyn UserService>(ctx, "UserService")?;
        let mfa = require::<dyn MfaService>(ctx, "MfaService")?;
        let sender = require::<dyn MessageSender>(ctx, "MessageSender")?;

        let awaiting_code = ctx.get_data(PW_CHALLENGE_KEY).is_some();

        if !awaiting_code {
            let Some(identifier) = ctx.value("identifier").map(str::to_string) else {
                return Ok(self.identifier_view(json!({ "channel": self.channel })));
            };

            if let Some(user) = users.find_by_identifier(&ctx.tenant_id, &identifier).await? {
                let challenge = mfa.issue_challenge(&ctx.tenant_id, &user.id).await?;
                sender
                    .send(
                        &ctx.tenant_id,
                        &code_message(&identifier, self.channel, &challenge.code),
                    )
                    .await?;
                ctx.set_data(PW_CHALLENGE_KEY, challenge.id);
                ctx.set_data(PW_USER_KEY, user.id);
                ctx.set_data(PW_USERNAME_KEY, user.username);
            } else {
                // Unknown identifier: same view, no code in flight, so any
                // submitted code fails verification.
                ctx.set_data(PW_CHALLENGE_KEY, "");
            }
            return Ok(StepHandlerResult::show_ui(
                "passwordless_code",
                json!({ "channel": self.channel }),
            ));
        }

        let Some(code) = ctx.value("code").map(str::to_string) else {
            return Ok(StepHandlerResult::show_ui(
                "passwordless_code",
                json!({ "channel": self.channel }),
            ));
        };
        let challenge_id = ctx
            .data_str(PW_CHALLENGE_KEY)
            .map(str::to_string)
            .unwrap_or_default();

        let verified = !challenge_id.is_empty()
            && mfa.verify_code(&ctx.tenant_id, &challenge_id, &code).await?;
        if verified {
            let user_id = ctx.data_str(PW_USER_KEY).map(str::to_string);
            let username = ctx.data_str(PW_USERNAME_KEY).map(str::to_string);
            let (Some(user_id), Some(username)) = (user_id, username) else {
                return Ok(StepHandlerResult::fail(
                    "invalid_code",
                    "the code is incorrect",
                ));
            };
            return Ok(StepHandlerResult::success_with(HashMap::from([
                ("sub".to_string(), Value::String(user_id)),
                ("preferred_username".to_string(), Value::String(username)),
                (
                    "authenticated_at".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                ),
                ("amr".to_string(), json!(["otp"])),
            ])));
        }

        let attempts = ctx
            .get_data(PW_ATTEMPTS_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(0)
            + 1;
        ctx.set_data(PW_ATTEMPTS_KEY, attempts);
        if attempts >= ctx.config_i64("maxAttempts", 3) {
            return Ok(StepHandlerResult::fail(
                "invalid_code",
                "the code is incorrect",
            ));
        }
        Ok(StepHandlerResult::show_ui(
            "passwordless_code",
            json!({ "channel": self.channel, "error": "invalid_code" }),
        ))
    }
}
