//! Shared test environment: in-memory stores, the full built-in handler
//! set, and canned collaborator services.

use std::sync::Arc;

use oluso_core::EngineConfig;
use oluso_journey::{JourneyOrchestrator, ServiceCatalog, StepHandlerRegistry};
use oluso_model::JourneyPolicy;
use oluso_steps::memory::{
    MemoryMfaService, MemoryUserService, RecordingMessageSender, StaticApiGateway,
    StaticCaptchaVerifier, StaticExternalIdp,
};
use oluso_steps::{
    register_builtin_handlers, ApiGateway, CaptchaVerifier, ExternalIdentityProvider,
    ManagedPluginExecutor, MessageSender, MfaService, PluginExecutor, UserService,
};
use oluso_store::{MemoryPolicyStore, MemoryStateStore, PolicyStore, StateStore};

pub const TENANT: &str = "acme";
pub const MFA_CODE: &str = "123456";
pub const CAPTCHA_TOKEN: &str = "captcha-ok";

pub struct TestEnv {
    pub orchestrator: JourneyOrchestrator,
    pub policies: Arc<MemoryPolicyStore>,
    pub states: Arc<MemoryStateStore>,
    pub users: Arc<MemoryUserService>,
    pub sender: Arc<RecordingMessageSender>,
    pub gateway: Arc<StaticApiGateway>,
    pub plugins: Arc<ManagedPluginExecutor>,
    pub idp: Arc<StaticExternalIdp>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        init_tracing();

        let policies = Arc::new(MemoryPolicyStore::new());
        let states = Arc::new(MemoryStateStore::new());
        let users = Arc::new(MemoryUserService::new());
        let mfa = Arc::new(MemoryMfaService::with_fixed_code(MFA_CODE));
        let sender = Arc::new(RecordingMessageSender::new());
        let gateway = Arc::new(StaticApiGateway::new());
        let plugins = Arc::new(ManagedPluginExecutor::new());
        let idp = Arc::new(StaticExternalIdp::new());

        let registry = Arc::new(StepHandlerRegistry::new());
        register_builtin_handlers(&registry).expect("fresh registry");

        let mut catalog = ServiceCatalog::new();
        catalog.register::<dyn UserService>(Arc::clone(&users) as Arc<dyn UserService>);
        catalog.register::<dyn MfaService>(mfa);
        catalog.register::<dyn MessageSender>(Arc::clone(&sender) as Arc<dyn MessageSender>);
        catalog.register::<dyn CaptchaVerifier>(Arc::new(StaticCaptchaVerifier::new(
            CAPTCHA_TOKEN,
        )));
        catalog.register::<dyn ApiGateway>(Arc::clone(&gateway) as Arc<dyn ApiGateway>);
        catalog.register::<dyn PluginExecutor>(Arc::clone(&plugins) as Arc<dyn PluginExecutor>);
        catalog.register::<dyn ExternalIdentityProvider>(
            Arc::clone(&idp) as Arc<dyn ExternalIdentityProvider>
        );

        let orchestrator = JourneyOrchestrator::new(
            Arc::clone(&policies) as Arc<dyn PolicyStore>,
            Arc::clone(&states) as Arc<dyn StateStore>,
            registry,
            Arc::new(catalog),
        )
        .with_config(config);

        Self {
            orchestrator,
            policies,
            states,
            users,
            sender,
            gateway,
            plugins,
            idp,
        }
    }

    pub fn add_policy(&self, policy: JourneyPolicy) {
        self.policies.put(policy);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
