//! Journey state storage provider trait.

use async_trait::async_trait;
use oluso_model::JourneyState;

use crate::error::StoreResult;

/// Provider for journey state persistence.
///
/// State records are keyed by the opaque journey ID and must survive across
/// independent HTTP requests. Implementations must provide at least
/// read-your-writes consistency per journey ID.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Creates a new state record.
    ///
    /// ## Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the journey ID is taken.
    async fn create(&self, state: &JourneyState) -> StoreResult<()>;

    /// Gets a state record by journey ID.
    ///
    /// Expired records are returned as-is; classifying expiry is the
    /// caller's concern so it can report `Expired` rather than not-found.
    async fn get(&self, journey_id: &str) -> StoreResult<Option<JourneyState>>;

    /// Conditionally updates a state record.
    ///
    /// The update succeeds only when the stored version matches
    /// `state.version`; on success the stored version is incremented.
    ///
    /// ## Errors
    ///
    /// Returns `StoreError::Conflict` when another writer got there first,
    /// and `StoreError::NotFound` when the record no longer exists.
    async fn update(&self, state: &JourneyState) -> StoreResult<u64>;

    /// Deletes a state record.
    ///
    /// Deleting a missing record is not an error.
    async fn delete(&self, journey_id: &str) -> StoreResult<()>;

    /// Removes expired state records.
    ///
    /// Returns the number of records removed.
    async fn purge_expired(&self) -> StoreResult<u64>;
}
