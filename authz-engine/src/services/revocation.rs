//! Revocation store - outstanding refresh-token identifiers.
//!
//! A registered id is the only proof a refresh token is still live: the
//! entry expires with the token's TTL, and revocation deletes it, so an
//! unknown, expired, and revoked id all read the same way (fail-closed).

use std::sync::Arc;

use crate::services::cache::SharedCache;
use crate::services::error::AuthzError;

const KEY_PREFIX: &str = "refresh:";

#[derive(Clone)]
pub struct RevocationStore {
    cache: Arc<dyn SharedCache>,
}

impl RevocationStore {
    pub fn new(cache: Arc<dyn SharedCache>) -> Self {
        Self { cache }
    }

    /// Record a freshly issued refresh-token id. TTL matches the refresh
    /// token's lifetime so the store self-cleans.
    pub async fn register(&self, token_id: &str, ttl_seconds: i64) -> Result<(), AuthzError> {
        self.cache
            .set(&Self::key(token_id), "1", ttl_seconds)
            .await
            .map_err(AuthzError::unavailable)
    }

    /// Mark an id revoked. Idempotent; revoking an unknown id is a no-op
    /// because the end state is identical.
    pub async fn revoke(&self, token_id: &str) -> Result<(), AuthzError> {
        self.cache
            .delete(&Self::key(token_id))
            .await
            .map(|_| ())
            .map_err(AuthzError::unavailable)
    }

    /// Atomically retire an id, returning whether it was still live. Of two
    /// concurrent consumers of the same id, exactly one sees `true`; the
    /// single-use refresh guarantee rests on this.
    pub async fn consume(&self, token_id: &str) -> Result<bool, AuthzError> {
        self.cache
            .delete(&Self::key(token_id))
            .await
            .map_err(AuthzError::unavailable)
    }

    /// False for unknown, expired, or revoked ids.
    pub async fn is_valid(&self, token_id: &str) -> Result<bool, AuthzError> {
        let value = self
            .cache
            .get(&Self::key(token_id))
            .await
            .map_err(AuthzError::unavailable)?;
        Ok(value.is_some())
    }

    fn key(token_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, token_id)
    }
}
