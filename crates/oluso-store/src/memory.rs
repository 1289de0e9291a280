//! In-memory reference stores.
//!
//! Non-durable implementations backing tests and single-node development.
//! State is lost on process restart; production deployments should provide
//! durable `PolicyStore`/`StateStore` implementations instead.

use async_trait::async_trait;
use dashmap::DashMap;
use oluso_model::{JourneyPolicy, JourneyState, JourneyType};

use crate::error::{StoreError, StoreResult};
use crate::policy::PolicyStore;
use crate::state::StateStore;

/// In-memory policy store keyed by `(tenant_id, policy_id)`.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    policies: DashMap<(String, String), JourneyPolicy>,
}

impl MemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a policy.
    pub fn put(&self, policy: JourneyPolicy) {
        self.policies
            .insert((policy.tenant_id.clone(), policy.id.clone()), policy);
    }

    /// Removes a policy.
    pub fn remove(&self, tenant_id: &str, policy_id: &str) {
        self.policies
            .remove(&(tenant_id.to_string(), policy_id.to_string()));
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn get_by_id(
        &self,
        tenant_id: &str,
        policy_id: &str,
    ) -> StoreResult<Option<JourneyPolicy>> {
        Ok(self
            .policies
            .get(&(tenant_id.to_string(), policy_id.to_string()))
            .map(|entry| entry.clone()))
    }

    async fn get_by_type(
        &self,
        tenant_id: &str,
        journey_type: &JourneyType,
    ) -> StoreResult<Vec<JourneyPolicy>> {
        Ok(self
            .policies
            .iter()
            .filter(|entry| {
                let policy = entry.value();
                policy.tenant_id == tenant_id
                    && policy.enabled
                    && policy.journey_type == *journey_type
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list(&self, tenant_id: &str) -> StoreResult<Vec<JourneyPolicy>> {
        Ok(self
            .policies
            .iter()
            .filter(|entry| entry.value().tenant_id == tenant_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// In-memory journey state store with version-stamped updates.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: DashMap<String, JourneyState>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records (expired included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn create(&self, state: &JourneyState) -> StoreResult<()> {
        match self.states.entry(state.id.clone()) {
            dashmap::Entry::Occupied(_) => Err(StoreError::AlreadyExists(state.id.clone())),
            dashmap::Entry::Vacant(entry) => {
                entry.insert(state.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, journey_id: &str) -> StoreResult<Option<JourneyState>> {
        Ok(self.states.get(journey_id).map(|entry| entry.clone()))
    }

    async fn update(&self, state: &JourneyState) -> StoreResult<u64> {
        // The dashmap entry lock makes the compare-and-swap atomic.
        match self.states.entry(state.id.clone()) {
            dashmap::Entry::Vacant(_) => Err(StoreError::NotFound(state.id.clone())),
            dashmap::Entry::Occupied(mut entry) => {
                let stored = entry.get();
                if stored.version != state.version {
                    return Err(StoreError::Conflict {
                        id: state.id.clone(),
                        expected: state.version,
                        actual: stored.version,
                    });
                }
                let mut next = state.clone();
                next.version += 1;
                let version = next.version;
                entry.insert(next);
                Ok(version)
            }
        }
    }

    async fn delete(&self, journey_id: &str) -> StoreResult<()> {
        self.states.remove(journey_id);
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let before = self.states.len();
        self.states.retain(|_, state| !state.is_expired());
        Ok((before - self.states.len()) as u64)
    }
}
