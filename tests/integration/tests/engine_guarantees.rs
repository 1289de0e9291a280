//! Cross-cutting engine guarantees: loop guard, concurrency, expiry,
//! cancellation, and registry discipline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use oluso_core::EngineConfig;
use oluso_journey::{
    EngineError, JourneyOrchestrator, ServiceCatalog, StartRequest, StepHandlerRegistry, StepInput,
};
use oluso_model::{JourneyPolicy, JourneyState, JourneyStatus, JourneyType, StepDefinition};
use oluso_steps::register_builtin_handlers;
use oluso_store::{
    MemoryPolicyStore, MemoryStateStore, PolicyStore, StateStore, StoreResult,
};

use crate::common::{TestEnv, TENANT};

/// A `condition` step whose branch map routes both outcomes back to itself
/// can never finish a request; the chain guard turns the cycle into a
/// failed journey instead of a hung request.
#[tokio::test]
async fn chain_guard_converts_cycle_into_failure() -> anyhow::Result<()> {
    let env = TestEnv::new();
    let steps = vec![StepDefinition::new("spin", "condition", 10)
        .config("when", json!({ "all": [] }))
        .branch("true", "spin")
        .branch("false", "spin")];
    env.add_policy(JourneyPolicy::new(
        "cycle",
        TENANT,
        JourneyType::Custom("cycle".to_string()),
        steps,
    ));

    let result = env
        .orchestrator
        .start_journey("cycle", StartRequest::new(TENANT))
        .await?;
    assert_eq!(result.status, JourneyStatus::Failed);
    assert_eq!(result.error.unwrap().code, "chain_limit_exceeded");
    Ok(())
}

/// State store decorator that slips a competing write in front of the
/// first engine update, forcing the engine's conditional write to lose.
struct RacingStateStore {
    inner: Arc<MemoryStateStore>,
    raced: AtomicBool,
}

#[async_trait]
impl StateStore for RacingStateStore {
    async fn create(&self, state: &JourneyState) -> StoreResult<()> {
        self.inner.create(state).await
    }

    async fn get(&self, journey_id: &str) -> StoreResult<Option<JourneyState>> {
        self.inner.get(journey_id).await
    }

    async fn update(&self, state: &JourneyState) -> StoreResult<u64> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            // The "other request" wins the version race.
            let competing = state.clone();
            self.inner.update(&competing).await?;
        }
        self.inner.update(state).await
    }

    async fn delete(&self, journey_id: &str) -> StoreResult<()> {
        self.inner.delete(journey_id).await
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        self.inner.purge_expired().await
    }
}

/// Losing the optimistic-concurrency race is benign: the caller gets an
/// in-progress result tagged `already_processed` and re-renders from
/// `get_state`, and the stored journey is whatever the winner wrote.
#[tokio::test]
async fn concurrent_continue_surfaces_already_processed() -> anyhow::Result<()> {
    let policies = Arc::new(MemoryPolicyStore::new());
    policies.put(JourneyPolicy::new(
        "form",
        TENANT,
        JourneyType::ProfileEdit,
        vec![StepDefinition::new("f", "dynamic-form", 10).config("fields", json!(["x"]))],
    ));
    let inner = Arc::new(MemoryStateStore::new());
    let registry = Arc::new(StepHandlerRegistry::new());
    register_builtin_handlers(&registry)?;

    let orchestrator = JourneyOrchestrator::new(
        Arc::clone(&policies) as Arc<dyn PolicyStore>,
        Arc::new(RacingStateStore {
            inner: Arc::clone(&inner),
            raced: AtomicBool::new(false),
        }),
        registry,
        Arc::new(ServiceCatalog::new()),
    );

    // The first persist (pausing at the form) hits the planted race.
    let result = orchestrator
        .start_journey("form", StartRequest::new(TENANT))
        .await?;
    assert_eq!(result.status, JourneyStatus::InProgress);
    assert!(result.current_step.is_none());
    assert_eq!(result.error.unwrap().code, "already_processed");

    // The winner's write is intact and the journey is still resumable.
    let state = orchestrator
        .get_state(&result.journey_id)
        .await?
        .expect("state survives a lost race");
    assert_eq!(state.status, JourneyStatus::InProgress);
    Ok(())
}

/// An expired journey reports `Expired` exactly once; the record is gone
/// afterwards and later continues see not-found.
#[tokio::test]
async fn expired_journey_reports_once_then_not_found() -> anyhow::Result<()> {
    let env = TestEnv::with_config(EngineConfig::default().with_ttl_secs(-1));
    env.add_policy(JourneyPolicy::new(
        "signin",
        TENANT,
        JourneyType::SignIn,
        vec![StepDefinition::new("login", "local-login", 10)],
    ));

    // Born expired thanks to the negative TTL; starting still renders.
    let started = env
        .orchestrator
        .start_journey("signin", StartRequest::new(TENANT))
        .await?;
    assert_eq!(started.status, JourneyStatus::InProgress);

    let expired = env
        .orchestrator
        .continue_journey(&started.journey_id, StepInput::empty())
        .await?;
    assert_eq!(expired.status, JourneyStatus::Expired);

    let err = env
        .orchestrator
        .continue_journey(&started.journey_id, StepInput::empty())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::JourneyNotFound(_)));
    Ok(())
}

/// Cancellation is terminal: the reserved action ends the journey without
/// running a handler, and a second cancel finds nothing to cancel.
#[tokio::test]
async fn cancel_is_terminal() -> anyhow::Result<()> {
    let env = TestEnv::new();
    env.add_policy(JourneyPolicy::new(
        "signin",
        TENANT,
        JourneyType::SignIn,
        vec![StepDefinition::new("login", "local-login", 10)],
    ));

    let started = env
        .orchestrator
        .start_journey("signin", StartRequest::new(TENANT))
        .await?;
    let cancelled = env.orchestrator.cancel_journey(&started.journey_id).await?;
    assert_eq!(cancelled.status, JourneyStatus::Cancelled);

    let err = env
        .orchestrator
        .cancel_journey(&started.journey_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::JourneyNotFound(_)));
    Ok(())
}

/// With terminal cleanup disabled the record survives for audit, but a
/// terminal journey still refuses continuation.
#[tokio::test]
async fn retained_terminal_record_cannot_be_continued() -> anyhow::Result<()> {
    let env = TestEnv::with_config(EngineConfig::default().retain_terminal());
    env.add_policy(JourneyPolicy::new(
        "noop",
        TENANT,
        JourneyType::Custom("noop".to_string()),
        vec![StepDefinition::new("t", "transform", 10).config("set", json!({ "done": true }))],
    ));

    let done = env
        .orchestrator
        .start_journey("noop", StartRequest::new(TENANT))
        .await?;
    assert_eq!(done.status, JourneyStatus::Completed);

    let record = env
        .orchestrator
        .get_state(&done.journey_id)
        .await?
        .expect("record retained");
    assert_eq!(record.status, JourneyStatus::Completed);

    let err = env
        .orchestrator
        .continue_journey(&done.journey_id, StepInput::empty())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::JourneyNotFound(_)));
    Ok(())
}

/// A disabled policy cannot start journeys.
#[tokio::test]
async fn disabled_policy_refuses_start() -> anyhow::Result<()> {
    let env = TestEnv::new();
    let mut policy = JourneyPolicy::new(
        "off",
        TENANT,
        JourneyType::SignIn,
        vec![StepDefinition::new("login", "local-login", 10)],
    );
    policy.enabled = false;
    env.add_policy(policy);

    let err = env
        .orchestrator
        .start_journey("off", StartRequest::new(TENANT))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PolicyDisabled(_)));
    Ok(())
}

/// One handler per step type per registry, ever.
#[tokio::test]
async fn duplicate_handler_registration_is_rejected() -> anyhow::Result<()> {
    let registry = StepHandlerRegistry::new();
    register_builtin_handlers(&registry)?;

    let err = register_builtin_handlers(&registry).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateHandler(_)));
    Ok(())
}

/// Steps sharing an order value tie-break by definition order, and
/// default-next only moves to strictly greater orders, so of two tied
/// steps, exactly the first-defined one ever runs.
#[tokio::test]
async fn tied_orders_resolve_deterministically() -> anyhow::Result<()> {
    let env = TestEnv::new();
    let steps = vec![
        StepDefinition::new("first", "transform", 10).config("set", json!({ "winner": "first" })),
        StepDefinition::new("second", "transform", 10)
            .config("set", json!({ "winner": "second" })),
    ];
    env.add_policy(JourneyPolicy::new(
        "tie",
        TENANT,
        JourneyType::Custom("tie".to_string()),
        steps,
    ));

    for _ in 0..5 {
        let done = env
            .orchestrator
            .start_journey("tie", StartRequest::new(TENANT))
            .await?;
        assert_eq!(done.status, JourneyStatus::Completed);
        assert_eq!(
            done.completion.unwrap().claims.get("winner"),
            Some(&json!("first"))
        );
    }
    Ok(())
}
