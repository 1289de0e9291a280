//! # oluso-steps
//!
//! The built-in step handlers for the Oluso journey engine, plus the
//! collaborator service traits they depend on.
//!
//! Handlers are stateless; everything a step knows lives in the
//! [`StepContext`](oluso_journey::StepContext): step configuration from
//! the policy, submitted input, and the journey data bag. Collaborators
//! (directory, message gateway, plugin runtime) are resolved through the
//! context's service catalog, so deployments and tests wire different
//! implementations behind the same traits.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod api;
pub mod consent;
pub mod flow;
pub mod forms;
pub mod login;
pub mod memory;
pub mod mfa;
pub mod password;
pub mod plugin;
pub mod registration;
pub mod services;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use oluso_journey::{EngineResult, StepHandlerRegistry};

pub use api::ApiCallHandler;
pub use consent::{CaptchaHandler, ConsentHandler, TermsAcceptanceHandler};
pub use flow::{BranchHandler, ConditionHandler, TransformHandler};
pub use forms::{ClaimsCollectionHandler, DynamicFormHandler};
pub use login::{
    CompositeLoginHandler, ExternalLoginHandler, LinkAccountHandler, LocalLoginHandler,
};
pub use mfa::{MfaHandler, PasswordlessHandler};
pub use password::{PasswordChangeHandler, PasswordResetHandler};
pub use plugin::{
    CustomPluginHandler, ManagedPlugin, ManagedPluginExecutor, PluginExecutor, PluginRequest,
    PluginResponse,
};
pub use registration::{CreateUserHandler, SignUpHandler, UpdateUserHandler};
pub use services::{
    ApiGateway, CaptchaVerifier, ExternalIdentity, ExternalIdentityProvider, IssuedChallenge,
    MessageChannel, MessageSender, MfaService, NewUser, OutboundMessage, ServiceError,
    ServiceResult, UserService, VerifiedUser,
};

/// Registers every built-in handler on the given registry.
///
/// ## Errors
///
/// Fails with `EngineError::DuplicateHandler` if any of the step types is
/// already bound, e.g. when a deployment pre-registered an override.
pub fn register_builtin_handlers(registry: &StepHandlerRegistry) -> EngineResult<()> {
    registry.register(Arc::new(LocalLoginHandler))?;
    registry.register(Arc::new(CompositeLoginHandler))?;
    registry.register(Arc::new(ExternalLoginHandler))?;
    registry.register(Arc::new(LinkAccountHandler))?;
    registry.register(Arc::new(MfaHandler))?;
    registry.register(Arc::new(PasswordlessHandler::email()))?;
    registry.register(Arc::new(PasswordlessHandler::sms()))?;
    registry.register(Arc::new(SignUpHandler))?;
    registry.register(Arc::new(CreateUserHandler))?;
    registry.register(Arc::new(UpdateUserHandler))?;
    registry.register(Arc::new(PasswordResetHandler))?;
    registry.register(Arc::new(PasswordChangeHandler))?;
    registry.register(Arc::new(ConsentHandler))?;
    registry.register(Arc::new(TermsAcceptanceHandler))?;
    registry.register(Arc::new(CaptchaHandler))?;
    registry.register(Arc::new(DynamicFormHandler))?;
    registry.register(Arc::new(ClaimsCollectionHandler))?;
    registry.register(Arc::new(ConditionHandler))?;
    registry.register(Arc::new(BranchHandler))?;
    registry.register(Arc::new(TransformHandler))?;
    registry.register(Arc::new(ApiCallHandler))?;
    registry.register(Arc::new(CustomPluginHandler))?;
    Ok(())
}
