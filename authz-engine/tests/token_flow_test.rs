mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authz_engine::models::{AuthorizationContext, TokenKind};
use authz_engine::services::{AuthzError, InMemoryCache, SharedCache};
use authz_engine::AuthzEngine;

use common::seeded_world;

#[tokio::test]
async fn issued_access_token_verifies_with_the_input_context() {
    let world = seeded_world();
    let context = AuthorizationContext::team(world.organization_id, world.team_id);

    let pair = world
        .engine
        .tokens
        .issue(&world.principal, context.clone())
        .await
        .unwrap();

    let claims = world
        .engine
        .tokens
        .verify_access(&pair.access_token)
        .await
        .unwrap();

    assert_eq!(claims.sub, world.principal.id);
    assert_eq!(claims.kind, TokenKind::Access);
    assert_eq!(claims.context, context);

    // Team deny overrides the org allow in the embedded snapshot.
    let permissions = claims.permissions.unwrap();
    assert!(!permissions.is_allowed("read"));
    assert!(permissions.is_allowed("write"));
}

#[tokio::test]
async fn access_token_carries_no_token_id_and_refresh_no_permissions() {
    let world = seeded_world();
    let context = AuthorizationContext::organization(world.organization_id);

    let pair = world
        .engine
        .tokens
        .issue(&world.principal, context)
        .await
        .unwrap();

    let access = world
        .engine
        .tokens
        .verify_access(&pair.access_token)
        .await
        .unwrap();
    assert!(access.token_id.is_none());
    assert!(access.permissions.is_some());

    // The refresh token round-trips through refresh(), which only works if
    // it carries a registered token id.
    let rotated = world.engine.tokens.refresh(&pair.refresh_token).await.unwrap();
    assert!(!rotated.refresh_token.is_empty());
}

#[tokio::test]
async fn refresh_succeeds_exactly_once() {
    let world = seeded_world();
    let context = AuthorizationContext::organization(world.organization_id);

    let pair = world
        .engine
        .tokens
        .issue(&world.principal, context)
        .await
        .unwrap();

    let rotated = world.engine.tokens.refresh(&pair.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    // The original token was rotated out; replaying it must fail.
    let err = world
        .engine
        .tokens
        .refresh(&pair.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Revoked));

    // The successor is live.
    world.engine.tokens.refresh(&rotated.refresh_token).await.unwrap();
}

/// Cache that delays deletes, widening the window between a refresh
/// reading a token id and retiring it.
struct SlowDeleteCache {
    inner: InMemoryCache,
}

#[async_trait]
impl SharedCache for SlowDeleteCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        self.inner.set(key, value, ttl_seconds).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.inner.delete(key).await
    }

    async fn incr(&self, key: &str) -> Result<i64, anyhow::Error> {
        self.inner.incr(key).await
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.inner.health_check().await
    }
}

#[tokio::test]
async fn concurrent_refreshes_of_one_token_rotate_exactly_once() {
    let world = seeded_world();
    let engine = AuthzEngine::new(
        &common::signed_config(),
        world.directory.clone(),
        Arc::new(SlowDeleteCache {
            inner: InMemoryCache::new(),
        }),
    )
    .unwrap();

    let pair = engine
        .tokens
        .issue(
            &world.principal,
            AuthorizationContext::organization(world.organization_id),
        )
        .await
        .unwrap();

    let engine_a = engine.clone();
    let engine_b = engine.clone();
    let token_a = pair.refresh_token.clone();
    let token_b = pair.refresh_token.clone();
    let first = tokio::spawn(async move { engine_a.tokens.refresh(&token_a).await });
    let second = tokio::spawn(async move { engine_b.tokens.refresh(&token_b).await });

    let results = [first.await.unwrap(), second.await.unwrap()];
    let rotations = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(rotations, 1, "refresh token must be single-use");
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AuthzError::Revoked))));
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let world = seeded_world();
    let context = AuthorizationContext::organization(world.organization_id);

    let pair = world
        .engine
        .tokens
        .issue(&world.principal, context)
        .await
        .unwrap();

    world.engine.tokens.revoke(&pair.refresh_token).await.unwrap();
    world.engine.tokens.revoke(&pair.refresh_token).await.unwrap();

    let err = world
        .engine
        .tokens
        .refresh(&pair.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Revoked));
}

#[tokio::test]
async fn revoked_refresh_token_stays_dead_but_access_token_still_verifies() {
    let world = seeded_world();
    let context = AuthorizationContext::organization(world.organization_id);

    let pair = world
        .engine
        .tokens
        .issue(&world.principal, context)
        .await
        .unwrap();

    world.engine.tokens.revoke(&pair.refresh_token).await.unwrap();

    // Access tokens are self-expiring by design and never consult the
    // revocation store.
    world
        .engine
        .tokens
        .verify_access(&pair.access_token)
        .await
        .unwrap();
}

#[tokio::test]
async fn token_kinds_are_not_interchangeable() {
    let world = seeded_world();
    let context = AuthorizationContext::organization(world.organization_id);

    let pair = world
        .engine
        .tokens
        .issue(&world.principal, context)
        .await
        .unwrap();

    let err = world
        .engine
        .tokens
        .verify_access(&pair.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::WrongTokenKind { .. }));

    let err = world
        .engine
        .tokens
        .refresh(&pair.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::WrongTokenKind { .. }));

    let err = world
        .engine
        .tokens
        .revoke(&pair.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::WrongTokenKind { .. }));
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
    let world = seeded_world();

    let err = world
        .engine
        .tokens
        .verify_access("not-a-token")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::MalformedToken));

    let err = world.engine.tokens.refresh("").await.unwrap_err();
    assert!(matches!(err, AuthzError::MalformedToken));
}

#[tokio::test]
async fn issue_rejects_a_context_the_principal_is_not_member_of() {
    let world = seeded_world();
    let foreign_org = uuid::Uuid::new_v4();

    let err = world
        .engine
        .tokens
        .issue(
            &world.principal,
            AuthorizationContext::organization(foreign_org),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotMember));
}
