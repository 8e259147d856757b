//! Context manager - validates and switches the active (organization, team)
//! scope for a principal.
//!
//! Every switch re-checks membership against the directory before a context
//! is handed back; tokens carrying the new context are minted by
//! `TokenService`, never here.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{AuthorizationContext, Principal, TokenClaims};
use crate::services::directory::DirectoryStore;
use crate::services::error::AuthzError;

/// One organization the principal belongs to, with its member teams.
/// Presentation data for the embedding client; never used to authorize.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableOrganization {
    pub organization_id: Uuid,
    pub team_ids: Vec<Uuid>,
}

#[derive(Clone)]
pub struct ContextManager {
    directory: Arc<dyn DirectoryStore>,
    lookup_timeout: Duration,
}

impl ContextManager {
    pub fn new(directory: Arc<dyn DirectoryStore>, lookup_timeout: Duration) -> Self {
        Self {
            directory,
            lookup_timeout,
        }
    }

    /// Activate an organization. The active team is reset: a team from the
    /// previous organization must not leak into the new scope.
    pub fn switch_organization(
        &self,
        principal: &Principal,
        organization_id: Uuid,
    ) -> Result<AuthorizationContext, AuthzError> {
        if !principal.is_organization_member(organization_id) {
            tracing::warn!(
                principal = %principal.id,
                organization = %organization_id,
                "Organization switch denied: not a member"
            );
            return Err(AuthzError::AccessDenied);
        }
        Ok(AuthorizationContext::organization(organization_id))
    }

    /// Activate a team, resolving its owning organization from the
    /// directory and validating membership in both.
    pub async fn switch_team(
        &self,
        principal: &Principal,
        team_id: Uuid,
    ) -> Result<AuthorizationContext, AuthzError> {
        if !principal.is_team_member(team_id) {
            tracing::warn!(
                principal = %principal.id,
                team = %team_id,
                "Team switch denied: not a member"
            );
            return Err(AuthzError::AccessDenied);
        }

        let owning_organization = self
            .owning_organization(team_id)
            .await?
            .ok_or(AuthzError::TeamNotInOrganization)?;

        if !principal.is_organization_member(owning_organization) {
            return Err(AuthzError::TeamNotInOrganization);
        }

        Ok(AuthorizationContext::team(owning_organization, team_id))
    }

    /// Activate an explicit (organization, team) pair.
    pub async fn switch_context(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<AuthorizationContext, AuthzError> {
        if !principal.is_organization_member(organization_id) {
            return Err(AuthzError::AccessDenied);
        }

        let Some(team_id) = team_id else {
            return Ok(AuthorizationContext::organization(organization_id));
        };

        if !principal.is_team_member(team_id) {
            return Err(AuthzError::AccessDenied);
        }

        let owning_organization = self.owning_organization(team_id).await?;
        if owning_organization != Some(organization_id) {
            return Err(AuthzError::TeamNotInOrganization);
        }

        Ok(AuthorizationContext::team(organization_id, team_id))
    }

    /// Login-time default: the first organization membership, no team.
    pub fn default_context(&self, principal: &Principal) -> Option<AuthorizationContext> {
        principal
            .organizations
            .first()
            .map(|m| AuthorizationContext::organization(m.organization_id))
    }

    /// The context the token was minted with.
    pub fn current_context(&self, claims: &TokenClaims) -> AuthorizationContext {
        claims.context.clone()
    }

    /// Every organization the principal belongs to and, per organization,
    /// every team within it the principal belongs to.
    pub fn available_contexts(&self, principal: &Principal) -> Vec<AvailableOrganization> {
        principal
            .organizations
            .iter()
            .map(|org| AvailableOrganization {
                organization_id: org.organization_id,
                team_ids: principal
                    .teams
                    .iter()
                    .filter(|t| t.organization_id == org.organization_id)
                    .map(|t| t.team_id)
                    .collect(),
            })
            .collect()
    }

    async fn owning_organization(&self, team_id: Uuid) -> Result<Option<Uuid>, AuthzError> {
        match tokio::time::timeout(
            self.lookup_timeout,
            self.directory.load_team_organization(team_id),
        )
        .await
        {
            Ok(Ok(owner)) => Ok(owner),
            Ok(Err(e)) => Err(AuthzError::unavailable(e)),
            Err(_) => Err(AuthzError::unavailable(anyhow::anyhow!(
                "directory lookup timed out"
            ))),
        }
    }
}
