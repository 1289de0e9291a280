//! In-memory collaborator implementations.
//!
//! These back the handler unit tests and the integration scenarios, and
//! double as a reference for wiring real implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use oluso_core::random_alphanumeric;

use crate::services::{
    ApiGateway, CaptchaVerifier, ExternalIdentity, ExternalIdentityProvider, IssuedChallenge,
    MessageSender, MfaService, NewUser, OutboundMessage, ServiceError, ServiceResult, UserService,
    VerifiedUser,
};

#[derive(Debug, Clone)]
struct StoredUser {
    id: String,
    username: String,
    email: Option<String>,
    phone: Option<String>,
    password: Option<String>,
    attributes: HashMap<String, Value>,
    links: Vec<(String, String)>,
}

impl StoredUser {
    fn verified(&self) -> VerifiedUser {
        VerifiedUser {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Users keyed by `(tenant, user id)`.
#[derive(Debug, Default)]
pub struct MemoryUserService {
    users: DashMap<(String, String), StoredUser>,
}

impl MemoryUserService {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user and returns its generated ID.
    pub fn add_user(
        &self,
        tenant_id: &str,
        username: &str,
        email: Option<&str>,
        password: Option<&str>,
    ) -> String {
        let id = Uuid::now_v7().to_string();
        self.users.insert(
            (tenant_id.to_string(), id.clone()),
            StoredUser {
                id: id.clone(),
                username: username.to_string(),
                email: email.map(str::to_string),
                phone: None,
                password: password.map(str::to_string),
                attributes: HashMap::new(),
                links: Vec::new(),
            },
        );
        id
    }

    /// Reads an attribute written through `update_attributes`.
    #[must_use]
    pub fn attribute(&self, tenant_id: &str, user_id: &str, key: &str) -> Option<Value> {
        self.users
            .get(&(tenant_id.to_string(), user_id.to_string()))
            .and_then(|user| user.attributes.get(key).cloned())
    }

    /// Lists external identity links for a user.
    #[must_use]
    pub fn links(&self, tenant_id: &str, user_id: &str) -> Vec<(String, String)> {
        self.users
            .get(&(tenant_id.to_string(), user_id.to_string()))
            .map(|user| user.links.clone())
            .unwrap_or_default()
    }

    fn find(&self, tenant_id: &str, identifier: &str) -> Option<StoredUser> {
        self.users
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .find(|entry| {
                let user = entry.value();
                user.username == identifier
                    || user.email.as_deref() == Some(identifier)
                    || user.phone.as_deref() == Some(identifier)
            })
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserService for MemoryUserService {
    async fn verify_credentials(
        &self,
        tenant_id: &str,
        username: &str,
        password: &str,
    ) -> ServiceResult<Option<VerifiedUser>> {
        Ok(self
            .find(tenant_id, username)
            .filter(|user| user.password.as_deref() == Some(password))
            .map(|user| user.verified()))
    }

    async fn find_by_identifier(
        &self,
        tenant_id: &str,
        identifier: &str,
    ) -> ServiceResult<Option<VerifiedUser>> {
        Ok(self.find(tenant_id, identifier).map(|user| user.verified()))
    }

    async fn create_user(&self, tenant_id: &str, user: NewUser) -> ServiceResult<VerifiedUser> {
        if self.find(tenant_id, &user.username).is_some() {
            return Err(ServiceError::Rejected("username already taken".to_string()));
        }
        let id = Uuid::now_v7().to_string();
        let stored = StoredUser {
            id: id.clone(),
            username: user.username,
            email: user.email,
            phone: user.phone,
            password: user.password,
            attributes: user.attributes,
            links: Vec::new(),
        };
        let verified = stored.verified();
        self.users.insert((tenant_id.to_string(), id), stored);
        Ok(verified)
    }

    async fn update_attributes(
        &self,
        tenant_id: &str,
        user_id: &str,
        attributes: HashMap<String, Value>,
    ) -> ServiceResult<()> {
        let mut user = self
            .users
            .get_mut(&(tenant_id.to_string(), user_id.to_string()))
            .ok_or(ServiceError::UserNotFound)?;
        user.attributes.extend(attributes);
        Ok(())
    }

    async fn set_password(
        &self,
        tenant_id: &str,
        user_id: &str,
        password: &str,
    ) -> ServiceResult<()> {
        let mut user = self
            .users
            .get_mut(&(tenant_id.to_string(), user_id.to_string()))
            .ok_or(ServiceError::UserNotFound)?;
        user.password = Some(password.to_string());
        Ok(())
    }

    async fn link_external_identity(
        &self,
        tenant_id: &str,
        user_id: &str,
        provider: &str,
        external_id: &str,
    ) -> ServiceResult<()> {
        let mut user = self
            .users
            .get_mut(&(tenant_id.to_string(), user_id.to_string()))
            .ok_or(ServiceError::UserNotFound)?;
        user.links
            .push((provider.to_string(), external_id.to_string()));
        Ok(())
    }
}

/// Single-use numeric codes held in memory, one row per open challenge.
#[derive(Debug, Default)]
pub struct MemoryMfaService {
    challenges: DashMap<String, String>,
    fixed_code: Option<String>,
}

impl MemoryMfaService {
    /// Creates a service issuing random six-character codes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service that always issues the given code. Test-friendly.
    #[must_use]
    pub fn with_fixed_code(code: impl Into<String>) -> Self {
        Self {
            challenges: DashMap::new(),
            fixed_code: Some(code.into()),
        }
    }
}

#[async_trait]
impl MfaService for MemoryMfaService {
    async fn issue_challenge(
        &self,
        _tenant_id: &str,
        _subject: &str,
    ) -> ServiceResult<IssuedChallenge> {
        let id = Uuid::now_v7().to_string();
        let code = self
            .fixed_code
            .clone()
            .unwrap_or_else(|| random_alphanumeric(6));
        self.challenges.insert(id.clone(), code.clone());
        Ok(IssuedChallenge { id, code })
    }

    async fn verify_code(
        &self,
        _tenant_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> ServiceResult<bool> {
        let matches = self
            .challenges
            .get(challenge_id)
            .is_some_and(|stored| stored.value() == code);
        if matches {
            self.challenges.remove(challenge_id);
        }
        Ok(matches)
    }
}

/// Records every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingMessageSender {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingMessageSender {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingMessageSender {
    async fn send(&self, _tenant_id: &str, message: &OutboundMessage) -> ServiceResult<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

/// A canned upstream identity provider: fixed redirect URL shape, callback
/// codes registered up front.
#[derive(Debug, Default)]
pub struct StaticExternalIdp {
    codes: DashMap<String, ExternalIdentity>,
}

impl StaticExternalIdp {
    /// Creates a provider with no registered callback codes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback code and the identity it resolves to.
    pub fn add_code(&self, code: impl Into<String>, identity: ExternalIdentity) {
        self.codes.insert(code.into(), identity);
    }
}

#[async_trait]
impl ExternalIdentityProvider for StaticExternalIdp {
    async fn authorization_url(
        &self,
        _tenant_id: &str,
        provider: &str,
        journey_id: &str,
    ) -> ServiceResult<String> {
        Ok(format!(
            "https://idp.example/{provider}/authorize?state={journey_id}"
        ))
    }

    async fn exchange_code(
        &self,
        _tenant_id: &str,
        _provider: &str,
        code: &str,
    ) -> ServiceResult<ExternalIdentity> {
        self.codes
            .get(code)
            .map(|identity| identity.clone())
            .ok_or_else(|| ServiceError::Rejected("unknown authorization code".to_string()))
    }
}

/// Accepts exactly one token.
#[derive(Debug)]
pub struct StaticCaptchaVerifier {
    valid_token: String,
}

impl StaticCaptchaVerifier {
    /// Creates a verifier accepting only the given token.
    #[must_use]
    pub fn new(valid_token: impl Into<String>) -> Self {
        Self {
            valid_token: valid_token.into(),
        }
    }
}

#[async_trait]
impl CaptchaVerifier for StaticCaptchaVerifier {
    async fn verify(&self, _tenant_id: &str, token: &str) -> ServiceResult<bool> {
        Ok(token == self.valid_token)
    }
}

/// Canned endpoint responses.
#[derive(Debug, Default)]
pub struct StaticApiGateway {
    responses: DashMap<String, HashMap<String, Value>>,
    calls: Mutex<Vec<(String, HashMap<String, Value>)>>,
}

impl StaticApiGateway {
    /// Creates a gateway with no registered endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the response an endpoint returns.
    pub fn respond(&self, endpoint: impl Into<String>, response: HashMap<String, Value>) {
        self.responses.insert(endpoint.into(), response);
    }

    /// Snapshot of all invocations.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, HashMap<String, Value>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ApiGateway for StaticApiGateway {
    async fn invoke(
        &self,
        _tenant_id: &str,
        endpoint: &str,
        payload: &HashMap<String, Value>,
    ) -> ServiceResult<HashMap<String, Value>> {
        self.calls
            .lock()
            .push((endpoint.to_string(), payload.clone()));
        self.responses
            .get(endpoint)
            .map(|response| response.clone())
            .ok_or_else(|| ServiceError::Rejected(format!("unknown endpoint {endpoint}")))
    }
}
