mod common;

use std::sync::Arc;

use authz_engine::models::{
    AuthMethod, OrganizationMembership, Principal, TeamMembership,
};
use authz_engine::services::{AuthzError, InMemoryCache, InMemoryDirectory};
use authz_engine::AuthzEngine;
use uuid::Uuid;

use common::{seeded_world, signed_config};

#[tokio::test]
async fn switch_team_re_mints_a_token_with_the_new_context() {
    let world = seeded_world();

    let context = world
        .engine
        .contexts
        .switch_team(&world.principal, world.team_id)
        .await
        .unwrap();
    assert_eq!(context.organization_id, world.organization_id);
    assert_eq!(context.team_id, Some(world.team_id));

    // Re-issue under the switched context, as the embedding service does.
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

    assert_eq!(world.engine.contexts.current_context(&claims), context);
}

#[tokio::test]
async fn switch_team_rejects_a_team_owned_by_an_unjoined_organization() {
    // The principal belongs to org A and to a team owned by org B, without
    // belonging to org B itself.
    let directory = Arc::new(InMemoryDirectory::new());
    let cache = Arc::new(InMemoryCache::new());

    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();
    let team = Uuid::new_v4();

    let principal = Principal {
        id: Uuid::new_v4(),
        organizations: vec![OrganizationMembership {
            organization_id: org_a,
            role_ids: vec![],
        }],
        teams: vec![TeamMembership {
            team_id: team,
            organization_id: org_b,
            role_ids: vec![],
        }],
        auth_method: AuthMethod::OAuth {
            provider: "github".to_string(),
        },
    };
    directory.insert_principal(principal.clone());

    let engine = AuthzEngine::new(&signed_config(), directory, cache).unwrap();

    let err = engine
        .contexts
        .switch_team(&principal, team)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::TeamNotInOrganization));
}

#[tokio::test]
async fn switch_team_requires_team_membership() {
    let world = seeded_world();
    let foreign_team = Uuid::new_v4();
    world.directory.insert_team(foreign_team, world.organization_id);

    let err = world
        .engine
        .contexts
        .switch_team(&world.principal, foreign_team)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::AccessDenied));
}

#[tokio::test]
async fn switch_organization_drops_the_active_team() {
    let world = seeded_world();

    let team_context = world
        .engine
        .contexts
        .switch_team(&world.principal, world.team_id)
        .await
        .unwrap();
    assert!(team_context.team_id.is_some());

    let org_context = world
        .engine
        .contexts
        .switch_organization(&world.principal, world.organization_id)
        .unwrap();
    assert_eq!(org_context.team_id, None);
}

#[tokio::test]
async fn default_context_is_the_first_organization() {
    let world = seeded_world();

    let context = world
        .engine
        .contexts
        .default_context(&world.principal)
        .unwrap();
    assert_eq!(context.organization_id, world.organization_id);
    assert_eq!(context.team_id, None);

    let nobody = Principal {
        id: Uuid::new_v4(),
        organizations: vec![],
        teams: vec![],
        auth_method: AuthMethod::Password,
    };
    assert!(world.engine.contexts.default_context(&nobody).is_none());
}

#[tokio::test]
async fn available_contexts_enumerate_memberships() {
    let world = seeded_world();

    let contexts = world.engine.contexts.available_contexts(&world.principal);

    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].organization_id, world.organization_id);
    assert_eq!(contexts[0].team_ids, vec![world.team_id]);
}

#[tokio::test]
async fn login_flow_issues_under_the_default_context() {
    let world = seeded_world();

    let context = world
        .engine
        .contexts
        .default_context(&world.principal)
        .unwrap();
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
    assert_eq!(claims.context, context);
    assert!(claims.permissions.unwrap().is_allowed("read"));
}
