//! Canonical claim set carried by both token formats.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::AuthorizationContext;
use super::permission_set::EffectivePermissionSet;

/// Token kind. Enforced by `TokenService`, carried losslessly by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried by every token.
///
/// Access tokens embed a permission snapshot and no token id; refresh tokens
/// embed a random token id (the revocation handle) and no permissions. Both
/// embed the active authorization context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (principal id)
    pub sub: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Access or refresh
    pub kind: TokenKind,
    /// Active (organization, team) scope
    pub context: AuthorizationContext,
    /// Permission snapshot (access tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<EffectivePermissionSet>,
    /// Revocation handle (refresh tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl TokenClaims {
    /// Build access-token claims with an embedded permission snapshot.
    pub fn access(
        sub: Uuid,
        context: AuthorizationContext,
        permissions: EffectivePermissionSet,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            kind: TokenKind::Access,
            context,
            permissions: Some(permissions),
            token_id: None,
        }
    }

    /// Build refresh-token claims carrying only the revocation handle.
    pub fn refresh(sub: Uuid, context: AuthorizationContext, token_id: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            kind: TokenKind::Refresh,
            context,
            permissions: None,
            token_id: Some(token_id),
        }
    }

    /// Check expiry against the wall clock.
    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}
