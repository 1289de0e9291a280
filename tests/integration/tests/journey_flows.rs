//! Sign-in and data-collection journey scenarios.

use serde_json::json;

use oluso_model::{
    Condition, ConditionSet, JourneyPolicy, JourneyStatus, JourneyType, StepDefinition,
};
use oluso_journey::{StartRequest, StepInput};
use oluso_steps::ExternalIdentity;

use crate::common::{TestEnv, MFA_CODE, TENANT};

fn signin_policy() -> JourneyPolicy {
    let steps = vec![
        StepDefinition::new("login", "local-login", 10),
        StepDefinition::new("mfa", "mfa", 20).optional_when(ConditionSet::single(
            Condition::equals("mfa_enrolled", true),
        )),
    ];
    let mut policy = JourneyPolicy::new("signin", TENANT, JourneyType::SignIn, steps);
    policy.success_message = Some("Welcome back".to_string());
    policy
}

/// A user without MFA enrollment completes right after the password check;
/// the MFA step is skipped and contributes nothing.
#[tokio::test]
async fn signin_skips_mfa_for_unenrolled_user() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.add_policy(signin_policy());
    let user_id = env.users.add_user(TENANT, "alice", None, Some("s3cret"));

    let started = env
        .orchestrator
        .start_journey("signin", StartRequest::new(TENANT))
        .await?;
    assert_eq!(started.status, JourneyStatus::InProgress);
    let step = started.current_step.as_ref().expect("paused at a step");
    assert_eq!(step.step_id, "login");
    assert_eq!(step.view, "login");

    let done = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty()
                .for_step("login")
                .value("username", "alice")
                .value("password", "s3cret"),
        )
        .await?;
    assert_eq!(done.status, JourneyStatus::Completed);

    let completion = done.completion.expect("completed journeys carry a completion");
    assert_eq!(completion.user_id.as_deref(), Some(user_id.as_str()));
    assert!(completion.claims.contains_key("authenticated_at"));
    assert!(!completion.claims.contains_key("mfa_verified_at"));
    assert_eq!(completion.success_message.as_deref(), Some("Welcome back"));
    Ok(())
}

/// Sign-in with a trailing consent prompt: the skipped MFA step does not
/// disturb default-next, and the completion carries both the bound user and
/// the claims from every step that ran.
#[tokio::test]
async fn signin_with_consent_completes_with_bound_user() -> anyhow::Result<()> {
    let env = TestEnv::new();
    let mut policy = signin_policy();
    policy.steps.push(
        StepDefinition::new("consent", "consent", 30)
            .config("scopes", json!(["openid", "profile"])),
    );
    env.add_policy(policy);
    let user_id = env.users.add_user(TENANT, "dora", None, Some("s3cret"));

    let started = env
        .orchestrator
        .start_journey("signin", StartRequest::new(TENANT))
        .await?;

    let prompted = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty()
                .for_step("login")
                .value("username", "dora")
                .value("password", "s3cret"),
        )
        .await?;
    assert_eq!(prompted.status, JourneyStatus::InProgress);
    assert_eq!(prompted.current_step.unwrap().view, "consent");

    let done = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::action("granted").for_step("consent"),
        )
        .await?;
    assert_eq!(done.status, JourneyStatus::Completed);

    let completion = done.completion.expect("completed journeys carry a completion");
    assert_eq!(completion.user_id.as_deref(), Some(user_id.as_str()));
    assert!(completion.claims.contains_key("authenticated_at"));
    assert_eq!(
        completion.claims.get("consented_scopes"),
        Some(&json!(["openid", "profile"]))
    );
    Ok(())
}

/// An enrolled user with no delivery address on file cannot be challenged;
/// the journey fails rather than silently skipping the second factor.
#[tokio::test]
async fn signin_fails_when_mfa_has_no_destination() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.add_policy(signin_policy());
    env.users.add_user(TENANT, "bob", None, Some("hunter22"));

    let started = env
        .orchestrator
        .start_journey(
            "signin",
            StartRequest::new(TENANT).with_data("mfa_enrolled", true),
        )
        .await?;

    let failed = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty()
                .for_step("login")
                .value("username", "bob")
                .value("password", "hunter22"),
        )
        .await?;
    assert_eq!(failed.status, JourneyStatus::Failed);
    assert_eq!(failed.error.unwrap().code, "mfa_unavailable");
    Ok(())
}

/// Full enrolled-user run with the delivery address seeded up front.
#[tokio::test]
async fn signin_with_mfa_round_trip() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.add_policy(signin_policy());
    env.users.add_user(TENANT, "carol", None, Some("pa55word"));

    let started = env
        .orchestrator
        .start_journey(
            "signin",
            StartRequest::new(TENANT)
                .with_data("mfa_enrolled", true)
                .with_data("email", "carol@acme.test"),
        )
        .await?;

    let challenged = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty()
                .for_step("login")
                .value("username", "carol")
                .value("password", "pa55word"),
        )
        .await?;
    assert_eq!(challenged.status, JourneyStatus::InProgress);
    assert_eq!(challenged.current_step.unwrap().view, "mfa");

    // Exactly one code went out, to the seeded address.
    let sent = env.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "carol@acme.test");

    let done = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty().for_step("mfa").value("code", MFA_CODE),
        )
        .await?;
    assert_eq!(done.status, JourneyStatus::Completed);
    let completion = done.completion.unwrap();
    assert!(completion.user_id.is_some());
    assert_eq!(completion.claims.get("amr"), Some(&json!(["mfa"])));
    Ok(())
}

/// The composite chooser branches to whichever sub-flow the user picks.
#[tokio::test]
async fn composite_login_branches_to_external() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.idp.add_code(
        "cb-1",
        ExternalIdentity {
            provider: "partner".to_string(),
            external_id: "p-77".to_string(),
            claims: [("sub".to_string(), json!("p-77"))].into(),
        },
    );
    let steps = vec![
        StepDefinition::new("choose", "composite-login", 10)
            .branch("local", "local")
            .branch("external", "external"),
        StepDefinition::new("external", "external-login", 20)
            .config("provider", "partner")
            // Mapped so the local path never falls through into it.
            .optional(),
        StepDefinition::new("local", "local-login", 30).optional(),
    ];
    env.add_policy(JourneyPolicy::new(
        "choose",
        TENANT,
        JourneyType::SignIn,
        steps,
    ));

    let started = env
        .orchestrator
        .start_journey("choose", StartRequest::new(TENANT))
        .await?;
    assert_eq!(started.current_step.unwrap().view, "login_chooser");

    let redirected = env
        .orchestrator
        .continue_journey(&started.journey_id, StepInput::action("external"))
        .await?;
    let step = redirected.current_step.unwrap();
    assert_eq!(step.view, "external_redirect");
    assert!(step.model["redirectUrl"]
        .as_str()
        .unwrap()
        .contains("/partner/authorize"));

    let done = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty().for_step("external").value("code", "cb-1"),
        )
        .await?;
    assert_eq!(done.status, JourneyStatus::Completed);
    assert_eq!(
        done.completion.unwrap().user_id.as_deref(),
        Some("p-77")
    );
    Ok(())
}

/// Zero-UI steps chain in one request and the data bag only accumulates:
/// every step's claims survive to completion.
#[tokio::test]
async fn data_bag_accumulates_across_chained_steps() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.gateway.respond(
        "enrich",
        [("department".to_string(), json!("support"))].into(),
    );
    let steps = vec![
        StepDefinition::new("profile", "dynamic-form", 10)
            .config("fields", json!(["given_name"])),
        StepDefinition::new("stamp", "transform", 20)
            .config("set", json!({ "source": "journey" })),
        StepDefinition::new("enrich", "api-call", 30)
            .config("endpoint", "enrich")
            .config("include", json!(["given_name"])),
    ];
    env.add_policy(JourneyPolicy::new(
        "profile",
        TENANT,
        JourneyType::ProfileEdit,
        steps,
    ));

    let started = env
        .orchestrator
        .start_journey(
            "profile",
            StartRequest::new(TENANT).with_data("redirect_uri", "https://app.acme.test/done"),
        )
        .await?;

    let done = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty().for_step("profile").value("given_name", "Ada"),
        )
        .await?;
    assert_eq!(done.status, JourneyStatus::Completed);

    let completion = done.completion.unwrap();
    assert_eq!(completion.claims.get("given_name"), Some(&json!("Ada")));
    assert_eq!(completion.claims.get("source"), Some(&json!("journey")));
    assert_eq!(completion.claims.get("department"), Some(&json!("support")));
    assert_eq!(
        completion.redirect_uri.as_deref(),
        Some("https://app.acme.test/done")
    );
    Ok(())
}

/// Re-entering a paused journey without input re-renders the same view and
/// moves nothing.
#[tokio::test]
async fn reentry_without_input_is_idempotent() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.add_policy(signin_policy());

    let started = env
        .orchestrator
        .start_journey("signin", StartRequest::new(TENANT))
        .await?;

    for _ in 0..3 {
        let again = env
            .orchestrator
            .continue_journey(&started.journey_id, StepInput::empty())
            .await?;
        assert_eq!(again.status, JourneyStatus::InProgress);
        assert_eq!(again.current_step.unwrap().step_id, "login");
    }

    let peeked = env
        .orchestrator
        .get_state(&started.journey_id)
        .await?
        .expect("journey persisted");
    assert_eq!(peeked.current_step_id, "login");
    Ok(())
}

/// A custom plugin drives a branch decision over the wire protocol.
#[tokio::test]
async fn custom_plugin_branches_journey() -> anyhow::Result<()> {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use oluso_steps::{ManagedPlugin, PluginRequest, PluginResponse, ServiceResult};

    struct Gate;

    #[async_trait]
    impl ManagedPlugin for Gate {
        fn plugin_id(&self) -> &'static str {
            "gate"
        }

        async fn handle(&self, request: &PluginRequest) -> ServiceResult<PluginResponse> {
            let vip = request.journey_data.get("tier") == Some(&json!("vip"));
            Ok(PluginResponse {
                success: true,
                error: None,
                action: Some(if vip { "branch" } else { "continue" }.to_string()),
                data: if vip {
                    HashMap::from([("branchId".to_string(), json!("fast_lane"))])
                } else {
                    HashMap::new()
                },
            })
        }
    }

    let env = TestEnv::new();
    env.plugins.register(std::sync::Arc::new(Gate));
    let steps = vec![
        StepDefinition::new("gate", "custom-plugin", 10)
            .config("pluginId", "gate")
            .branch("fast_lane", "vip"),
        StepDefinition::new("slow", "transform", 20)
            .config("set", json!({ "lane": "slow" }))
            .optional(),
        StepDefinition::new("vip", "transform", 30)
            .config("set", json!({ "lane": "fast" }))
            .optional(),
    ];
    env.add_policy(JourneyPolicy::new(
        "gate",
        TENANT,
        JourneyType::Custom("gate".to_string()),
        steps,
    ));

    let done = env
        .orchestrator
        .start_journey("gate", StartRequest::new(TENANT).with_data("tier", "vip"))
        .await?;
    assert_eq!(done.status, JourneyStatus::Completed);
    assert_eq!(
        done.completion.unwrap().claims.get("lane"),
        Some(&json!("fast"))
    );
    Ok(())
}
