//! Registration and account-recovery journey scenarios.

use serde_json::json;

use oluso_journey::{StartRequest, StepInput};
use oluso_model::{JourneyPolicy, JourneyStatus, JourneyType, StepDefinition};
use oluso_steps::UserService;

use crate::common::{TestEnv, CAPTCHA_TOKEN, TENANT};

/// Password reset completes identically whether or not the identifier
/// resolves to an account, so nothing leaks; only the real account gets a
/// message.
#[tokio::test]
async fn password_reset_never_reveals_account_existence() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.add_policy(
        JourneyPolicy::new(
            "reset",
            TENANT,
            JourneyType::PasswordReset,
            vec![StepDefinition::new("request", "password-reset", 10)],
        )
        .with_success_message("Check your inbox"),
    );
    env.users
        .add_user(TENANT, "alice", Some("alice@acme.test"), Some("old"));

    let mut outcomes = Vec::new();
    for identifier in ["alice@acme.test", "nobody@acme.test"] {
        let started = env
            .orchestrator
            .start_journey("reset", StartRequest::new(TENANT))
            .await?;
        assert_eq!(started.current_step.unwrap().view, "password_reset");

        let done = env
            .orchestrator
            .continue_journey(
                &started.journey_id,
                StepInput::empty()
                    .for_step("request")
                    .value("identifier", identifier),
            )
            .await?;
        assert_eq!(done.status, JourneyStatus::Completed);
        let completion = done.completion.unwrap();
        // No user is ever bound by recovery, but the caller still gets the
        // policy's confirmation copy.
        assert!(completion.user_id.is_none());
        assert_eq!(
            completion.success_message.as_deref(),
            Some("Check your inbox")
        );
        outcomes.push(completion.claims);
    }
    assert_eq!(outcomes[0], outcomes[1]);

    let sent = env.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "alice@acme.test");
    assert_eq!(sent[0].template, "password_reset");
    Ok(())
}

/// Registration: collect the form, pass the bot check, materialize the
/// user. The password stash is scrubbed before completion.
#[tokio::test]
async fn signup_journey_creates_user() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.add_policy(JourneyPolicy::new(
        "signup",
        TENANT,
        JourneyType::SignUp,
        vec![
            StepDefinition::new("form", "sign-up", 10),
            StepDefinition::new("bot_check", "captcha", 20),
            StepDefinition::new("create", "create-user", 30),
        ],
    ));

    let started = env
        .orchestrator
        .start_journey("signup", StartRequest::new(TENANT))
        .await?;
    assert_eq!(started.current_step.unwrap().view, "sign_up");

    let at_captcha = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty()
                .for_step("form")
                .value("username", "dora")
                .value("email", "dora@acme.test")
                .value("password", "correct-horse"),
        )
        .await?;
    assert_eq!(at_captcha.status, JourneyStatus::InProgress);
    assert_eq!(at_captcha.current_step.unwrap().view, "captcha");

    let done = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty()
                .for_step("bot_check")
                .value("captchaToken", CAPTCHA_TOKEN),
        )
        .await?;
    assert_eq!(done.status, JourneyStatus::Completed);

    let completion = done.completion.unwrap();
    let new_user_id = completion.user_id.clone().expect("created user is bound");
    assert_eq!(
        completion.claims.get("preferred_username"),
        Some(&json!("dora"))
    );
    // The registration stash (password included) was nulled out.
    assert_eq!(
        completion.claims.get("pending_registration"),
        Some(&serde_json::Value::Null)
    );

    // The account really exists and can sign in.
    let verified = env
        .users
        .verify_credentials(TENANT, "dora", "correct-horse")
        .await?;
    assert_eq!(verified.map(|user| user.id), Some(new_user_id));
    Ok(())
}

/// Signing up with an already-taken username fails the journey with a
/// generic failure code once `create-user` runs.
#[tokio::test]
async fn signup_with_taken_username_fails() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.users.add_user(TENANT, "dora", None, None);
    env.add_policy(JourneyPolicy::new(
        "signup",
        TENANT,
        JourneyType::SignUp,
        vec![
            StepDefinition::new("form", "sign-up", 10),
            StepDefinition::new("create", "create-user", 20),
        ],
    ));

    let started = env
        .orchestrator
        .start_journey("signup", StartRequest::new(TENANT))
        .await?;
    let failed = env
        .orchestrator
        .continue_journey(
            &started.journey_id,
            StepInput::empty()
                .for_step("form")
                .value("username", "dora")
                .value("email", "other@acme.test")
                .value("password", "correct-horse"),
        )
        .await?;
    assert_eq!(failed.status, JourneyStatus::Failed);
    assert_eq!(failed.error.unwrap().code, "registration_failed");
    Ok(())
}
