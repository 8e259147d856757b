//! Token service - issuance, rotation, revocation, and verification of the
//! access/refresh token pair.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use rand::RngCore;
use serde::Serialize;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::{AuthorizationContext, Principal, TokenClaims, TokenKind};
use crate::services::codec::ClaimCodec;
use crate::services::context::ContextManager;
use crate::services::directory::DirectoryStore;
use crate::services::error::AuthzError;
use crate::services::resolver::PermissionResolver;
use crate::services::revocation::RevocationStore;

/// Token pair returned to the caller.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenService {
    codec: Arc<ClaimCodec>,
    revocations: RevocationStore,
    resolver: PermissionResolver,
    contexts: ContextManager,
    directory: Arc<dyn DirectoryStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    lookup_timeout: StdDuration,
}

impl TokenService {
    pub fn new(
        codec: Arc<ClaimCodec>,
        revocations: RevocationStore,
        resolver: PermissionResolver,
        contexts: ContextManager,
        directory: Arc<dyn DirectoryStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            codec,
            revocations,
            resolver,
            contexts,
            directory,
            access_ttl: Duration::minutes(config.token.access_token_expiry_minutes),
            refresh_ttl: Duration::days(config.token.refresh_token_expiry_days),
            lookup_timeout: StdDuration::from_millis(config.resolver.lookup_timeout_ms),
        }
    }

    /// Issue an access/refresh pair for a validated context. The access
    /// token embeds the freshly resolved permission snapshot; the refresh
    /// token's id is registered for revocation lookups.
    pub async fn issue(
        &self,
        principal: &Principal,
        context: AuthorizationContext,
    ) -> Result<TokenPair, AuthzError> {
        let permissions = self
            .resolver
            .resolve(principal, context.organization_id, context.team_id)
            .await?;

        let access_claims = TokenClaims::access(
            principal.id,
            context.clone(),
            permissions,
            self.access_ttl,
        );
        let access_token = self.codec.encode(&access_claims)?;

        let token_id = new_token_id();
        let refresh_claims =
            TokenClaims::refresh(principal.id, context.clone(), token_id.clone(), self.refresh_ttl);
        let refresh_token = self.codec.encode(&refresh_claims)?;

        self.revocations
            .register(&token_id, self.refresh_ttl.num_seconds())
            .await?;

        tracing::info!(
            principal = %principal.id,
            organization = %context.organization_id,
            team = ?context.team_id,
            "Issued token pair"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Rotate a refresh token: validate it, retire it, and issue the
    /// successor pair under a re-validated context with freshly resolved
    /// permissions. The old token is single-use.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthzError> {
        let claims = self.codec.decode(refresh_token)?;
        expect_kind(TokenKind::Refresh, claims.kind)?;

        let token_id = claims.token_id.as_deref().ok_or(AuthzError::MalformedToken)?;

        // Retire the old id in a single atomic step before minting the
        // successor: concurrent refreshes of the same token race on the
        // delete, and only the winner proceeds. A failure past this point
        // leaves the token dead, never reusable.
        if !self.revocations.consume(token_id).await? {
            tracing::warn!(principal = %claims.sub, "Refresh attempt with a retired token");
            return Err(AuthzError::Revoked);
        }

        let principal = self
            .load_principal(claims.sub)
            .await?
            .ok_or(AuthzError::AccessDenied)?;

        let context = self
            .contexts
            .switch_context(
                &principal,
                claims.context.organization_id,
                claims.context.team_id,
            )
            .await?;

        self.issue(&principal, context).await
    }

    /// Revoke a refresh token. Idempotent: expired, already-revoked, and
    /// unknown tokens all succeed, since the end state is already reached.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthzError> {
        let claims = self.codec.decode_ignoring_expiry(refresh_token)?;
        expect_kind(TokenKind::Refresh, claims.kind)?;

        let token_id = claims.token_id.as_deref().ok_or(AuthzError::MalformedToken)?;
        self.revocations.revoke(token_id).await?;

        tracing::info!(principal = %claims.sub, "Refresh token revoked");
        Ok(())
    }

    /// Verify an access token and return its claims. Access tokens are
    /// short-lived and self-expiring; they are never checked against the
    /// revocation store.
    pub async fn verify_access(&self, access_token: &str) -> Result<TokenClaims, AuthzError> {
        let claims = self.codec.decode(access_token)?;
        expect_kind(TokenKind::Access, claims.kind)?;
        Ok(claims)
    }

    async fn load_principal(&self, id: Uuid) -> Result<Option<Principal>, AuthzError> {
        match tokio::time::timeout(self.lookup_timeout, self.directory.load_principal(id)).await {
            Ok(Ok(principal)) => Ok(principal),
            Ok(Err(e)) => Err(AuthzError::unavailable(e)),
            Err(_) => Err(AuthzError::unavailable(anyhow::anyhow!(
                "directory lookup timed out"
            ))),
        }
    }
}

fn expect_kind(expected: TokenKind, actual: TokenKind) -> Result<(), AuthzError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AuthzError::WrongTokenKind { expected, actual })
    }
}

/// Random non-guessable refresh-token identifier (32 bytes, hex).
fn new_token_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
