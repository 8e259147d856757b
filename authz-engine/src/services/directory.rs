//! Directory port - read-only access to principal, membership, and role data.
//!
//! The persistence layer behind this trait is owned by other modules;
//! mutations made there must be reported to `PermissionResolver::invalidate`
//! so the version counters move.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    OrganizationMembership, PermissionGrant, Principal, Role, ScopeKind, TeamMembership,
};

/// Membership rows for one principal.
#[derive(Debug, Clone, Default)]
pub struct Memberships {
    pub organizations: Vec<OrganizationMembership>,
    pub teams: Vec<TeamMembership>,
}

/// Read-only persistence interface consumed by the engine.
///
/// `load_roles` returns the role rows attached to a scope without their
/// grant lists; grants are fetched per role through `load_role_permissions`.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn load_principal(&self, id: Uuid) -> Result<Option<Principal>, anyhow::Error>;
    async fn load_memberships(&self, principal_id: Uuid) -> Result<Memberships, anyhow::Error>;
    async fn load_roles(
        &self,
        scope: ScopeKind,
        scope_id: Uuid,
    ) -> Result<Vec<Role>, anyhow::Error>;
    async fn load_role_permissions(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<PermissionGrant>, anyhow::Error>;
    /// Owning organization of a team, if the team exists.
    async fn load_team_organization(&self, team_id: Uuid) -> Result<Option<Uuid>, anyhow::Error>;
}

#[derive(Default)]
struct DirectoryData {
    principals: HashMap<Uuid, Principal>,
    // (scope kind, scope id) -> role rows, grants stripped
    scope_roles: HashMap<(ScopeKind, Uuid), Vec<Role>>,
    role_grants: HashMap<Uuid, Vec<PermissionGrant>>,
    team_organizations: HashMap<Uuid, Uuid>,
}

/// In-memory directory for tests and embeddings without a database.
pub struct InMemoryDirectory {
    data: Mutex<DirectoryData>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(DirectoryData::default()),
        }
    }

    pub fn insert_principal(&self, principal: Principal) {
        let mut data = self.data.lock().expect("directory mutex poisoned");
        for team in &principal.teams {
            data.team_organizations
                .insert(team.team_id, team.organization_id);
        }
        data.principals.insert(principal.id, principal);
    }

    /// Attach a role (with its grants) to a scope.
    pub fn insert_role(&self, scope_id: Uuid, role: Role) {
        let mut data = self.data.lock().expect("directory mutex poisoned");
        data.role_grants.insert(role.id, role.grants.clone());
        let row = Role {
            grants: Vec::new(),
            ..role
        };
        data.scope_roles
            .entry((row.scope, scope_id))
            .or_default()
            .push(row);
    }

    pub fn insert_team(&self, team_id: Uuid, organization_id: Uuid) {
        self.data
            .lock()
            .expect("directory mutex poisoned")
            .team_organizations
            .insert(team_id, organization_id);
    }

    /// Replace a role's grants in place, as a role mutation would.
    pub fn update_role_grants(&self, role_id: Uuid, grants: Vec<PermissionGrant>) {
        self.data
            .lock()
            .expect("directory mutex poisoned")
            .role_grants
            .insert(role_id, grants);
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn load_principal(&self, id: Uuid) -> Result<Option<Principal>, anyhow::Error> {
        let data = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("Directory mutex poisoned: {}", e))?;
        Ok(data.principals.get(&id).cloned())
    }

    async fn load_memberships(&self, principal_id: Uuid) -> Result<Memberships, anyhow::Error> {
        let data = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("Directory mutex poisoned: {}", e))?;
        Ok(data
            .principals
            .get(&principal_id)
            .map(|p| Memberships {
                organizations: p.organizations.clone(),
                teams: p.teams.clone(),
            })
            .unwrap_or_default())
    }

    async fn load_roles(
        &self,
        scope: ScopeKind,
        scope_id: Uuid,
    ) -> Result<Vec<Role>, anyhow::Error> {
        let data = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("Directory mutex poisoned: {}", e))?;
        Ok(data
            .scope_roles
            .get(&(scope, scope_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn load_role_permissions(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<PermissionGrant>, anyhow::Error> {
        let data = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("Directory mutex poisoned: {}", e))?;
        Ok(data.role_grants.get(&role_id).cloned().unwrap_or_default())
    }

    async fn load_team_organization(&self, team_id: Uuid) -> Result<Option<Uuid>, anyhow::Error> {
        let data = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("Directory mutex poisoned: {}", e))?;
        Ok(data.team_organizations.get(&team_id).copied())
    }
}
