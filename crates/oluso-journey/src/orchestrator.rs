//! Journey orchestration.
//!
//! The orchestrator drives the step machine: it starts a journey, continues
//! it with user input, applies branching and optional-skip rules, persists
//! every state transition, and produces a terminal or in-progress result.
//! It holds no in-memory journey state of its own: each call loads the
//! persisted [`JourneyState`], runs to completion, and persists before
//! returning, so a crash between steps leaves the journey resumable from
//! the last persisted step.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use oluso_core::{EngineConfig, EventLogger, JourneyEvent, JourneyEventType, TracingEventLogger};
use oluso_model::{JourneyPolicy, JourneyState, JourneyStatus, StepDefinition};
use oluso_store::{PolicyStore, StateStore, StoreError};

use crate::condition::evaluate_set;
use crate::error::{EngineError, EngineResult};
use crate::handler::{ServiceCatalog, StepContext, StepHandlerResult};
use crate::registry::StepHandlerRegistry;
use crate::result::{Completion, CurrentStep, JourneyResult, StartRequest, StepInput};

/// Error codes the orchestrator itself produces.
pub mod codes {
    /// The current step (or a branch target) no longer exists in the
    /// policy, or the policy itself vanished mid-flight.
    pub const INVALID_POLICY: &str = "invalid_policy";
    /// No handler registered for a step's declared type.
    pub const MISSING_HANDLER: &str = "missing_handler";
    /// A handler returned an unexpected error.
    pub const STEP_ERROR: &str = "step_error";
    /// The auto-advance chain exceeded its guard.
    pub const CHAIN_LIMIT_EXCEEDED: &str = "chain_limit_exceeded";
}

/// Outcome of a conditional state write.
enum Persist {
    Saved,
    Conflict,
}

/// The journey engine's orchestrator.
pub struct JourneyOrchestrator {
    policies: Arc<dyn PolicyStore>,
    states: Arc<dyn StateStore>,
    registry: Arc<StepHandlerRegistry>,
    services: Arc<ServiceCatalog>,
    events: Arc<dyn EventLogger>,
    config: EngineConfig,
}

impl JourneyOrchestrator {
    /// Creates an orchestrator with default configuration and tracing-based
    /// event logging.
    #[must_use]
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        states: Arc<dyn StateStore>,
        registry: Arc<StepHandlerRegistry>,
        services: Arc<ServiceCatalog>,
    ) -> Self {
        Self {
            policies,
            states,
            registry,
            services,
            events: Arc::new(TracingEventLogger::new()),
            config: EngineConfig::default(),
        }
    }

    /// Replaces the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the event logger.
    #[must_use]
    pub fn with_event_logger(mut self, events: Arc<dyn EventLogger>) -> Self {
        self.events = events;
        self
    }

    /// Starts a new journey for the given policy.
    ///
    /// Creates state positioned at the policy's first eligible step and
    /// immediately runs the step loop once, so zero-UI leading steps
    /// execute within this call.
    ///
    /// ## Errors
    ///
    /// Returns `EngineError::PolicyNotFound` / `PolicyDisabled` when the
    /// policy cannot start journeys, and storage errors otherwise.
    pub async fn start_journey(
        &self,
        policy_id: &str,
        request: StartRequest,
    ) -> EngineResult<JourneyResult> {
        let policy = self
            .policies
            .get_by_id(&request.tenant_id, policy_id)
            .await?
            .ok_or_else(|| EngineError::PolicyNotFound {
                tenant_id: request.tenant_id.clone(),
                policy_id: policy_id.to_string(),
            })?;
        if !policy.enabled {
            return Err(EngineError::PolicyDisabled(policy.id.clone()));
        }

        let first = Self::first_eligible(&policy, &request.initial_data);
        let mut state = JourneyState::new(
            &policy.id,
            &request.tenant_id,
            first.map_or("", |step| step.id.as_str()),
            self.config.journey_ttl_secs,
        );
        state.data = request.initial_data;
        state.user_id = request.user_id;

        self.events.log(
            &JourneyEvent::builder(JourneyEventType::JourneyStarted)
                .tenant(&state.tenant_id)
                .journey(&state.id)
                .policy(&policy.id)
                .build(),
        );

        // A policy whose steps are all skipped completes on the spot; no
        // state record is ever persisted for it.
        if first.is_none() {
            return self.finish_completed(state, &policy).await;
        }

        self.states.create(&state).await?;
        self.run(state, &policy, StepInput::empty()).await
    }

    /// Continues an in-flight journey with user input.
    ///
    /// ## Errors
    ///
    /// Returns `EngineError::JourneyNotFound` when the journey ID is absent
    /// or the journey is already terminal. Terminal records may have been
    /// physically deleted, so the cases are indistinguishable by design.
    pub async fn continue_journey(
        &self,
        journey_id: &str,
        input: StepInput,
    ) -> EngineResult<JourneyResult> {
        let state = self.load_active(journey_id).await?;
        let state = match state {
            Loaded::Active(state) => state,
            Loaded::Expired(result) => return Ok(result),
        };

        if input.is_cancel() {
            return self.finish_cancelled(state).await;
        }

        let Some(policy) = self
            .policies
            .get_by_id(&state.tenant_id, &state.policy_id)
            .await?
        else {
            tracing::error!(
                journey_id = %state.id,
                policy_id = %state.policy_id,
                "policy vanished mid-journey"
            );
            return self
                .finish_failed(state, codes::INVALID_POLICY, "policy no longer exists")
                .await;
        };

        self.run(state, &policy, input).await
    }

    /// Reads journey state without advancing the journey.
    ///
    /// Used by the UI layer to re-render the current step after a redirect.
    pub async fn get_state(&self, journey_id: &str) -> EngineResult<Option<JourneyState>> {
        Ok(self.states.get(journey_id).await?)
    }

    /// Cancels an in-flight journey.
    ///
    /// Equivalent to continuing with the reserved `cancel` action; no step
    /// handler runs.
    pub async fn cancel_journey(&self, journey_id: &str) -> EngineResult<JourneyResult> {
        match self.load_active(journey_id).await? {
            Loaded::Expired(result) => Ok(result),
            Loaded::Active(state) => self.finish_cancelled(state).await,
        }
    }

    /// Loads a journey that is still allowed to move.
    async fn load_active(&self, journey_id: &str) -> EngineResult<Loaded> {
        let Some(state) = self.states.get(journey_id).await? else {
            return Err(EngineError::JourneyNotFound(journey_id.to_string()));
        };
        if state.status.is_terminal() {
            // Retained-for-audit terminal records behave like deleted ones.
            return Err(EngineError::JourneyNotFound(journey_id.to_string()));
        }
        if state.is_expired() {
            self.events.log(
                &JourneyEvent::builder(JourneyEventType::JourneyExpired)
                    .tenant(&state.tenant_id)
                    .journey(&state.id)
                    .policy(&state.policy_id)
                    .build(),
            );
            self.states.delete(journey_id).await?;
            return Ok(Loaded::Expired(JourneyResult::expired(journey_id)));
        }
        Ok(Loaded::Active(state))
    }

    /// The step loop of one request: execute the current step, advance on
    /// success, and keep chaining zero-UI steps until one pauses, the
    /// policy ends, or the chain guard trips.
    async fn run(
        &self,
        mut state: JourneyState,
        policy: &JourneyPolicy,
        input: StepInput,
    ) -> EngineResult<JourneyResult> {
        let max_chain = policy.steps.len() + self.config.chain_guard_slack;
        let mut input = Some(input);

        for _ in 0..max_chain {
            let Some(step) = policy.step(&state.current_step_id).cloned() else {
                tracing::error!(
                    journey_id = %state.id,
                    step_id = %state.current_step_id,
                    "current step missing from policy (edited mid-flight?)"
                );
                return self
                    .finish_failed(
                        state,
                        codes::INVALID_POLICY,
                        "current step no longer exists in the policy",
                    )
                    .await;
            };

            // A stale form post (input rendered for a different step) must
            // not feed values into this handler; drop it and re-render.
            if let Some(submitted) = input.as_ref() {
                if submitted
                    .step_id
                    .as_deref()
                    .is_some_and(|step_id| step_id != step.id)
                {
                    tracing::debug!(
                        journey_id = %state.id,
                        submitted = ?submitted.step_id,
                        current = %step.id,
                        "discarding stale step input"
                    );
                    input = Some(StepInput::empty());
                }
            }

            let Some(handler) = self.registry.resolve(&step.step_type) else {
                tracing::error!(
                    journey_id = %state.id,
                    step_type = %step.step_type,
                    "no handler registered for step type"
                );
                return self
                    .finish_failed(
                        state,
                        codes::MISSING_HANDLER,
                        "no handler registered for step type",
                    )
                    .await;
            };

            let StepInput { action, values, .. } = input.take().unwrap_or_default();
            let mut context = StepContext::new(
                &state,
                step.clone(),
                action,
                values,
                Arc::clone(&self.services),
            );

            let outcome = match handler.execute(&mut context).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(
                        journey_id = %state.id,
                        step_id = %step.id,
                        error = %err,
                        "step handler returned an unexpected error"
                    );
                    // Data written before the failure is kept for audit.
                    state.data = context.data;
                    return self
                        .finish_failed(state, codes::STEP_ERROR, "an unexpected error occurred")
                        .await;
                }
            };

            state.data = context.data;
            state.user_id = context.user_id;

            self.events.log(
                &JourneyEvent::builder(JourneyEventType::StepExecuted)
                    .tenant(&state.tenant_id)
                    .journey(&state.id)
                    .policy(&policy.id)
                    .step(&step.id, &step.step_type)
                    .build(),
            );

            let (claims, branch_outcome) = match outcome {
                StepHandlerResult::ShowUi { view, model } => {
                    // Suspension point: same step, data bag as mutated so far.
                    return match self.persist(&mut state).await? {
                        Persist::Conflict => Ok(JourneyResult::already_processed(&state.id)),
                        Persist::Saved => Ok(JourneyResult::in_progress(
                            &state.id,
                            CurrentStep {
                                step_id: step.id.clone(),
                                step_type: step.step_type.clone(),
                                view,
                                model,
                            },
                        )),
                    };
                }
                StepHandlerResult::Fail { code, message } => {
                    // The expected business failure path; not a server error.
                    tracing::debug!(
                        journey_id = %state.id,
                        step_id = %step.id,
                        code = %code,
                        "step reported failure"
                    );
                    return self.finish_failed(state, &code, &message).await;
                }
                StepHandlerResult::Success { claims } => (claims, None),
                StepHandlerResult::Branch { outcome, claims } => (claims, Some(outcome)),
            };

            if let Some(sub) = claims.get("sub").and_then(Value::as_str) {
                state.bind_user(sub);
            }
            state.merge_data(claims);

            // Explicit branch target wins over default ordering; an
            // unmapped outcome falls through to default-next.
            let branch_target = branch_outcome
                .as_ref()
                .and_then(|outcome| step.branches.get(outcome));
            let next = if let Some(target_id) = branch_target {
                let Some(target) = policy.step(target_id) else {
                    tracing::error!(
                        journey_id = %state.id,
                        step_id = %step.id,
                        target = %target_id,
                        "branch target missing from policy"
                    );
                    return self
                        .finish_failed(
                            state,
                            codes::INVALID_POLICY,
                            "branch target does not exist in the policy",
                        )
                        .await;
                };
                Some(target)
            } else {
                self.default_next(policy, &step, &state)
            };

            let Some(next) = next else {
                return self.finish_completed(state, policy).await;
            };

            state.current_step_id = next.id.clone();
            match self.persist(&mut state).await? {
                Persist::Conflict => return Ok(JourneyResult::already_processed(&state.id)),
                Persist::Saved => {}
            }
            // Loop: the chained step executes with no user input, so
            // zero-UI steps (condition, transform, api-call) run in
            // sequence within this request.
        }

        tracing::error!(
            journey_id = %state.id,
            policy_id = %policy.id,
            max_chain,
            "auto-advance chain guard tripped; policy likely cycles"
        );
        self.finish_failed(
            state,
            codes::CHAIN_LIMIT_EXCEEDED,
            "policy auto-advance exceeded the configured chain limit",
        )
        .await
    }

    /// First step a fresh journey lands on, honoring optional-skip rules
    /// against the seed data.
    fn first_eligible<'a>(
        policy: &'a JourneyPolicy,
        data: &HashMap<String, Value>,
    ) -> Option<&'a StepDefinition> {
        policy
            .steps_in_order()
            .into_iter()
            .find(|step| Self::is_eligible(step, data))
    }

    /// Default-next selection: the smallest-order eligible step strictly
    /// after the current one. Skipped steps never execute and contribute
    /// nothing to the data bag.
    fn default_next<'a>(
        &self,
        policy: &'a JourneyPolicy,
        current: &StepDefinition,
        state: &JourneyState,
    ) -> Option<&'a StepDefinition> {
        for step in policy.steps_after(current.order) {
            if Self::is_eligible(step, &state.data) {
                return Some(step);
            }
            self.events.log(
                &JourneyEvent::builder(JourneyEventType::StepSkipped)
                    .tenant(&state.tenant_id)
                    .journey(&state.id)
                    .policy(&policy.id)
                    .step(&step.id, &step.step_type)
                    .build(),
            );
        }
        None
    }

    /// An optional step runs only when it has a condition and the condition
    /// holds; an optional step without a condition is always skipped.
    fn is_eligible(step: &StepDefinition, data: &HashMap<String, Value>) -> bool {
        !step.optional
            || step
                .condition
                .as_ref()
                .is_some_and(|condition| evaluate_set(condition, data))
    }

    /// Conditional write of the state record.
    async fn persist(&self, state: &mut JourneyState) -> EngineResult<Persist> {
        match self.states.update(state).await {
            Ok(version) => {
                state.version = version;
                Ok(Persist::Saved)
            }
            Err(err) if err.is_conflict() => {
                tracing::debug!(journey_id = %state.id, "lost a concurrent continuation race");
                Ok(Persist::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Writes or removes a terminal record per configuration.
    async fn finalize(&self, state: &mut JourneyState) -> EngineResult<()> {
        if self.config.cleanup_terminal {
            self.states.delete(&state.id).await?;
            return Ok(());
        }
        match self.states.update(state).await {
            Ok(version) => state.version = version,
            Err(err) if err.is_conflict() => {
                tracing::debug!(journey_id = %state.id, "terminal write lost a race");
            }
            Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    async fn finish_completed(
        &self,
        mut state: JourneyState,
        policy: &JourneyPolicy,
    ) -> EngineResult<JourneyResult> {
        state.status = JourneyStatus::Completed;

        let mut event = JourneyEvent::builder(JourneyEventType::JourneyCompleted)
            .tenant(&state.tenant_id)
            .journey(&state.id)
            .policy(&policy.id);
        if let Some(user_id) = &state.user_id {
            event = event.user(user_id);
        }
        self.events.log(&event.build());

        self.finalize(&mut state).await?;

        let completion = Completion {
            user_id: state.user_id.clone(),
            claims: state.data.clone(),
            redirect_uri: state
                .data
                .get("redirect_uri")
                .and_then(Value::as_str)
                .map(str::to_string),
            success_message: policy.success_message.clone(),
        };
        Ok(JourneyResult::completed(&state.id, completion))
    }

    async fn finish_failed(
        &self,
        mut state: JourneyState,
        code: &str,
        message: &str,
    ) -> EngineResult<JourneyResult> {
        state.status = JourneyStatus::Failed;
        self.events.log(
            &JourneyEvent::builder(JourneyEventType::JourneyFailed)
                .tenant(&state.tenant_id)
                .journey(&state.id)
                .policy(&state.policy_id)
                .step(&state.current_step_id, "")
                .failure(code)
                .build(),
        );
        self.finalize(&mut state).await?;
        Ok(JourneyResult::failed(&state.id, code, message))
    }

    async fn finish_cancelled(&self, mut state: JourneyState) -> EngineResult<JourneyResult> {
        state.status = JourneyStatus::Cancelled;
        self.events.log(
            &JourneyEvent::builder(JourneyEventType::JourneyCancelled)
                .tenant(&state.tenant_id)
                .journey(&state.id)
                .policy(&state.policy_id)
                .build(),
        );
        self.finalize(&mut state).await?;
        Ok(JourneyResult::cancelled(&state.id))
    }
}

impl std::fmt::Debug for JourneyOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyOrchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

enum Loaded {
    Active(JourneyState),
    Expired(JourneyResult),
}
