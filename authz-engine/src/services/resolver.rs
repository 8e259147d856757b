//! Permission resolver - computes effective permission sets with a
//! versioned read-through cache.
//!
//! Cache entries are keyed by a per-(org, team) version counter. Role and
//! assignment mutations bump the counter, so stale entries are simply never
//! looked up again; nothing is actively purged.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::config::ResolverConfig;
use crate::models::{EffectivePermissionSet, Principal, Role, ScopeKind};
use crate::services::cache::SharedCache;
use crate::services::directory::DirectoryStore;
use crate::services::error::AuthzError;

#[derive(Clone)]
pub struct PermissionResolver {
    directory: Arc<dyn DirectoryStore>,
    cache: Arc<dyn SharedCache>,
    lookup_timeout: Duration,
    cache_ttl_seconds: i64,
}

impl PermissionResolver {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        cache: Arc<dyn SharedCache>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            directory,
            cache,
            lookup_timeout: Duration::from_millis(config.lookup_timeout_ms),
            cache_ttl_seconds: config.permission_cache_ttl_seconds,
        }
    }

    /// Effective permissions for the principal in the given scope.
    pub async fn resolve(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<EffectivePermissionSet, AuthzError> {
        if !principal.is_organization_member(organization_id) {
            return Err(AuthzError::NotMember);
        }

        if let Some(team_id) = team_id {
            let owning_org = match principal.team_membership(team_id) {
                Some(membership) => Some(membership.organization_id),
                None => self
                    .lookup(self.directory.load_team_organization(team_id))
                    .await?,
            };
            if owning_org != Some(organization_id) {
                return Err(AuthzError::TeamNotInOrganization);
            }
        }

        let version = self.scope_version(organization_id, team_id).await?;
        let cache_key = format!(
            "perms:{}:{}:{}:v{}",
            principal.id,
            organization_id,
            scope_segment(team_id),
            version
        );

        if let Some(cached) = self
            .cache
            .get(&cache_key)
            .await
            .map_err(AuthzError::unavailable)?
        {
            match serde_json::from_str::<EffectivePermissionSet>(&cached) {
                Ok(set) => return Ok(set),
                Err(e) => {
                    tracing::warn!(key = %cache_key, "Discarding undecodable cached permission set: {}", e);
                }
            }
        }

        let organization_roles = self
            .held_roles(
                ScopeKind::Organization,
                organization_id,
                principal.organization_role_ids(organization_id),
            )
            .await?;

        let team_roles = match team_id {
            Some(team_id) => {
                self.held_roles(ScopeKind::Team, team_id, principal.team_role_ids(team_id))
                    .await?
            }
            None => Vec::new(),
        };

        let set = EffectivePermissionSet::from_scopes(&organization_roles, &team_roles);

        let serialized = serde_json::to_string(&set)
            .map_err(|e| AuthzError::unavailable(anyhow::anyhow!(e)))?;
        self.cache
            .set(&cache_key, &serialized, self.cache_ttl_seconds)
            .await
            .map_err(AuthzError::unavailable)?;

        tracing::debug!(
            principal = %principal.id,
            organization = %organization_id,
            team = ?team_id,
            version,
            keys = set.len(),
            "Resolved effective permission set"
        );

        Ok(set)
    }

    /// Bump the version counter for a scope. Called after any role or
    /// assignment mutation; also serves as the manual cache refresh.
    pub async fn invalidate(
        &self,
        organization_id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<i64, AuthzError> {
        let version = self
            .cache
            .incr(&version_key(organization_id, team_id))
            .await
            .map_err(AuthzError::unavailable)?;
        tracing::info!(
            organization = %organization_id,
            team = ?team_id,
            version,
            "Permission cache version bumped"
        );
        Ok(version)
    }

    async fn scope_version(
        &self,
        organization_id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<i64, AuthzError> {
        let value = self
            .cache
            .get(&version_key(organization_id, team_id))
            .await
            .map_err(AuthzError::unavailable)?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    /// Roles the principal holds in one scope, with their grant lists.
    async fn held_roles(
        &self,
        scope: ScopeKind,
        scope_id: Uuid,
        held_ids: &[Uuid],
    ) -> Result<Vec<Role>, AuthzError> {
        let mut roles: Vec<Role> = self
            .lookup(self.directory.load_roles(scope, scope_id))
            .await?
            .into_iter()
            .filter(|role| held_ids.contains(&role.id))
            .collect();

        for role in &mut roles {
            role.grants = self
                .lookup(self.directory.load_role_permissions(role.id))
                .await?;
        }

        Ok(roles)
    }

    /// Directory lookups run under a request-level timeout; a timeout is a
    /// denial, never a grant.
    async fn lookup<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, anyhow::Error>>,
    ) -> Result<T, AuthzError> {
        match tokio::time::timeout(self.lookup_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AuthzError::unavailable(e)),
            Err(_) => Err(AuthzError::unavailable(anyhow::anyhow!(
                "directory lookup timed out"
            ))),
        }
    }
}

fn version_key(organization_id: Uuid, team_id: Option<Uuid>) -> String {
    format!(
        "perm_ver:{}:{}",
        organization_id,
        scope_segment(team_id)
    )
}

fn scope_segment(team_id: Option<Uuid>) -> String {
    team_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}
