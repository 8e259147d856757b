//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use authz_engine::config::{
    EngineConfig, Environment, RedisConfig, ResolverConfig, TokenConfig, TokenMode,
};
use authz_engine::models::{
    AuthMethod, OrganizationMembership, PermissionGrant, Principal, Role, ScopeKind,
    TeamMembership,
};
use authz_engine::services::{InMemoryCache, InMemoryDirectory};
use authz_engine::AuthzEngine;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub fn signed_config() -> EngineConfig {
    EngineConfig {
        environment: Environment::Dev,
        service_name: "authz-engine-test".to_string(),
        log_level: "debug".to_string(),
        redis: RedisConfig {
            url: "redis://unused-in-tests".to_string(),
        },
        token: TokenConfig {
            mode: TokenMode::Signed,
            signing_secret: TEST_SECRET.to_string(),
            private_key_path: String::new(),
            public_key_path: String::new(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        },
        resolver: ResolverConfig {
            lookup_timeout_ms: 2000,
            permission_cache_ttl_seconds: 300,
        },
    }
}

/// Seeded engine world: one principal holding an org role granting `read`
/// and a team role denying `read` and granting `write`.
pub struct TestWorld {
    pub engine: AuthzEngine,
    pub directory: Arc<InMemoryDirectory>,
    pub cache: Arc<InMemoryCache>,
    pub principal: Principal,
    pub organization_id: Uuid,
    pub team_id: Uuid,
    pub org_role_id: Uuid,
    pub team_role_id: Uuid,
}

pub fn seeded_world() -> TestWorld {
    authz_engine::init_tracing("debug");

    let directory = Arc::new(InMemoryDirectory::new());
    let cache = Arc::new(InMemoryCache::new());

    let organization_id = Uuid::new_v4();
    let team_id = Uuid::new_v4();

    let org_role = Role::new(
        "org-reader",
        ScopeKind::Organization,
        vec![PermissionGrant::allow("read")],
    );
    let team_role = Role::new(
        "team-writer",
        ScopeKind::Team,
        vec![PermissionGrant::deny("read"), PermissionGrant::allow("write")],
    );
    let org_role_id = org_role.id;
    let team_role_id = team_role.id;

    let principal = Principal {
        id: Uuid::new_v4(),
        organizations: vec![OrganizationMembership {
            organization_id,
            role_ids: vec![org_role_id],
        }],
        teams: vec![TeamMembership {
            team_id,
            organization_id,
            role_ids: vec![team_role_id],
        }],
        auth_method: AuthMethod::Password,
    };

    directory.insert_role(organization_id, org_role);
    directory.insert_role(team_id, team_role);
    directory.insert_principal(principal.clone());

    let engine = AuthzEngine::new(&signed_config(), directory.clone(), cache.clone())
        .expect("engine construction");

    TestWorld {
        engine,
        directory,
        cache,
        principal,
        organization_id,
        team_id,
        org_role_id,
        team_role_id,
    }
}
