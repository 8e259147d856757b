//! Token and context authorization engine.
//!
//! Issues and verifies dual-format session tokens (HMAC-signed or
//! encrypted-claim), manages the refresh/revocation lifecycle, and resolves
//! RBAC permissions across the user -> organization -> team hierarchy with
//! context switching carried in token claims.
//!
//! Persistence and the shared cache are consumed through the
//! [`services::DirectoryStore`] and [`services::SharedCache`] traits; route
//! wiring, schemas, and login mechanics live in the embedding service.

pub mod config;
pub mod models;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::services::{
    ClaimCodec, ContextManager, DirectoryStore, PermissionResolver, RevocationStore, SharedCache,
    TokenService,
};
use crate::services::error::AuthzError;

/// Fully wired engine: the token service plus the collaborators callers
/// reach directly (context switching, manual permission-cache refresh).
#[derive(Clone)]
pub struct AuthzEngine {
    pub tokens: TokenService,
    pub contexts: ContextManager,
    pub resolver: PermissionResolver,
    pub revocations: RevocationStore,
}

impl AuthzEngine {
    /// Wire the engine from configuration and the two external
    /// collaborators. The claim codec is built once from the configured
    /// token mode and never switched afterwards.
    pub fn new(
        config: &EngineConfig,
        directory: Arc<dyn DirectoryStore>,
        cache: Arc<dyn SharedCache>,
    ) -> Result<Self, AuthzError> {
        let codec = Arc::new(ClaimCodec::from_config(&config.token)?);
        let revocations = RevocationStore::new(cache.clone());
        let resolver = PermissionResolver::new(directory.clone(), cache, &config.resolver);
        let contexts = ContextManager::new(
            directory.clone(),
            Duration::from_millis(config.resolver.lookup_timeout_ms),
        );
        let tokens = TokenService::new(
            codec,
            revocations.clone(),
            resolver.clone(),
            contexts.clone(),
            directory,
            config,
        );

        tracing::info!(service = %config.service_name, "Authorization engine initialized");

        Ok(Self {
            tokens,
            contexts,
            resolver,
            revocations,
        })
    }
}

/// Initialize logging for binaries and integration tests.
pub fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
