//! Journey policy storage provider trait.

use async_trait::async_trait;
use oluso_model::{JourneyPolicy, JourneyType};

use crate::error::StoreResult;

/// Provider for journey policy storage.
///
/// Policies are read-mostly external configuration; the engine only reads.
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Gets a policy by tenant and ID.
    async fn get_by_id(&self, tenant_id: &str, policy_id: &str)
        -> StoreResult<Option<JourneyPolicy>>;

    /// Gets the enabled policies of a given type for a tenant.
    async fn get_by_type(
        &self,
        tenant_id: &str,
        journey_type: &JourneyType,
    ) -> StoreResult<Vec<JourneyPolicy>>;

    /// Lists all policies for a tenant.
    async fn list(&self, tenant_id: &str) -> StoreResult<Vec<JourneyPolicy>>;

    /// Checks if a policy exists.
    async fn exists(&self, tenant_id: &str, policy_id: &str) -> StoreResult<bool> {
        Ok(self.get_by_id(tenant_id, policy_id).await?.is_some())
    }
}
