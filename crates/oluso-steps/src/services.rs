//! Collaborator service traits.
//!
//! Step handlers never talk to user directories, message gateways, or
//! external identity providers directly. They resolve these traits from the
//! [`ServiceCatalog`](oluso_journey::ServiceCatalog) on the step context,
//! so a deployment wires in real implementations while tests wire in the
//! in-memory doubles from [`crate::memory`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use oluso_journey::{EngineError, StepContext};

/// Errors surfaced by collaborator services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The referenced user does not exist.
    #[error("user not found")]
    UserNotFound,
    /// The service declined the operation (duplicate user, weak password,
    /// unknown endpoint). The message is safe to log but not to show.
    #[error("{0}")]
    Rejected(String),
    /// The backing system misbehaved.
    #[error("service backend error: {0}")]
    Backend(String),
}

/// Convenience alias for service call results.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ServiceError> for EngineError {
    fn from(err: ServiceError) -> Self {
        EngineError::Internal(err.to_string())
    }
}

/// A user as seen by the journey engine. Deliberately narrow; the directory
/// owns the full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    /// Stable user identifier, emitted as the `sub` claim.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Primary email, if any.
    pub email: Option<String>,
    /// Primary phone number, if any.
    pub phone: Option<String>,
}

/// Registration payload handed to [`UserService::create_user`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Requested login name.
    pub username: String,
    /// Optional email address.
    pub email: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Initial password, if collected.
    pub password: Option<String>,
    /// Arbitrary additional attributes.
    pub attributes: HashMap<String, Value>,
}

/// Directory operations the built-in handlers need.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Checks a username/password pair.
    ///
    /// `None` means the credentials do not match; whether the user exists
    /// at all is deliberately not distinguishable from the outside.
    async fn verify_credentials(
        &self,
        tenant_id: &str,
        username: &str,
        password: &str,
    ) -> ServiceResult<Option<VerifiedUser>>;

    /// Looks a user up by username, email, or phone number.
    async fn find_by_identifier(
        &self,
        tenant_id: &str,
        identifier: &str,
    ) -> ServiceResult<Option<VerifiedUser>>;

    /// Creates a user from a completed registration.
    async fn create_user(&self, tenant_id: &str, user: NewUser) -> ServiceResult<VerifiedUser>;

    /// Writes attribute values onto an existing user.
    async fn update_attributes(
        &self,
        tenant_id: &str,
        user_id: &str,
        attributes: HashMap<String, Value>,
    ) -> ServiceResult<()>;

    /// Replaces a user's password, enforcing the tenant password policy.
    async fn set_password(&self, tenant_id: &str, user_id: &str, password: &str)
        -> ServiceResult<()>;

    /// Links an external identity to an existing user.
    async fn link_external_identity(
        &self,
        tenant_id: &str,
        user_id: &str,
        provider: &str,
        external_id: &str,
    ) -> ServiceResult<()>;
}

/// A freshly issued one-time-code challenge.
///
/// The code is returned to the caller so the handler can choose the
/// delivery channel; the service only stores and verifies it.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    /// Opaque challenge identifier, persisted in the journey data bag.
    pub id: String,
    /// The one-time code to deliver.
    pub code: String,
}

/// One-time-code issuance and verification.
#[async_trait]
pub trait MfaService: Send + Sync {
    /// Issues a single-use code bound to the given subject.
    async fn issue_challenge(&self, tenant_id: &str, subject: &str)
        -> ServiceResult<IssuedChallenge>;

    /// Verifies a submitted code. A successful verification consumes the
    /// challenge.
    async fn verify_code(
        &self,
        tenant_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> ServiceResult<bool>;
}

/// Delivery channel for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageChannel {
    /// Email delivery.
    Email,
    /// SMS delivery.
    Sms,
}

/// A templated message for a message gateway to render and send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Destination address or number.
    pub recipient: String,
    /// Delivery channel.
    pub channel: MessageChannel,
    /// Template name, resolved by the gateway per tenant.
    pub template: String,
    /// Template variables.
    pub variables: HashMap<String, String>,
}

/// Outbound message gateway.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends one message.
    async fn send(&self, tenant_id: &str, message: &OutboundMessage) -> ServiceResult<()>;
}

/// Claims returned by an upstream identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdentity {
    /// Provider alias the identity came from.
    pub provider: String,
    /// The provider's stable subject identifier.
    pub external_id: String,
    /// Claims asserted by the provider.
    pub claims: HashMap<String, Value>,
}

/// Client for brokered login against upstream identity providers.
#[async_trait]
pub trait ExternalIdentityProvider: Send + Sync {
    /// Builds the authorization redirect for a provider, with the journey
    /// ID carried as the state parameter.
    async fn authorization_url(
        &self,
        tenant_id: &str,
        provider: &str,
        journey_id: &str,
    ) -> ServiceResult<String>;

    /// Exchanges a callback code for the asserted identity.
    async fn exchange_code(
        &self,
        tenant_id: &str,
        provider: &str,
        code: &str,
    ) -> ServiceResult<ExternalIdentity>;
}

/// Challenge-token verification (reCAPTCHA and friends).
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Verifies a client-supplied challenge token.
    async fn verify(&self, tenant_id: &str, token: &str) -> ServiceResult<bool>;
}

/// Outbound call surface for the `api-call` step.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// Invokes a named endpoint with a JSON payload and returns the
    /// response body as a claim map.
    async fn invoke(
        &self,
        tenant_id: &str,
        endpoint: &str,
        payload: &HashMap<String, Value>,
    ) -> ServiceResult<HashMap<String, Value>>;
}

/// Resolves a required service from the context catalog, turning its
/// absence into a wiring error rather than a business failure.
pub(crate) fn require<T>(ctx: &StepContext, name: &str) -> Result<Arc<T>, EngineError>
where
    T: ?Sized + Send + Sync + 'static,
{
    ctx.service::<T>()
        .ok_or_else(|| EngineError::Internal(format!("{name} is not registered in the service catalog")))
}
