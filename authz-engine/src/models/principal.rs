//! Principal - the identity performing a request, with its memberships.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the principal authenticated. Carried for audit purposes only; the
/// engine never branches on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Password,
    OAuth { provider: String },
}

/// Membership in an organization, with the role ids held there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub organization_id: Uuid,
    pub role_ids: Vec<Uuid>,
}

/// Membership in a team. Each team belongs to exactly one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMembership {
    pub team_id: Uuid,
    pub organization_id: Uuid,
    pub role_ids: Vec<Uuid>,
}

/// Identity performing the request. Built from persisted user + membership
/// rows by the directory and immutable for the rest of the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub organizations: Vec<OrganizationMembership>,
    pub teams: Vec<TeamMembership>,
    pub auth_method: AuthMethod,
}

impl Principal {
    pub fn is_organization_member(&self, organization_id: Uuid) -> bool {
        self.organizations
            .iter()
            .any(|m| m.organization_id == organization_id)
    }

    pub fn is_team_member(&self, team_id: Uuid) -> bool {
        self.teams.iter().any(|m| m.team_id == team_id)
    }

    /// Role ids the principal holds in an organization.
    pub fn organization_role_ids(&self, organization_id: Uuid) -> &[Uuid] {
        self.organizations
            .iter()
            .find(|m| m.organization_id == organization_id)
            .map(|m| m.role_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Role ids the principal holds in a team.
    pub fn team_role_ids(&self, team_id: Uuid) -> &[Uuid] {
        self.teams
            .iter()
            .find(|m| m.team_id == team_id)
            .map(|m| m.role_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn team_membership(&self, team_id: Uuid) -> Option<&TeamMembership> {
        self.teams.iter().find(|m| m.team_id == team_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_lookups() {
        let org = Uuid::new_v4();
        let team = Uuid::new_v4();
        let role = Uuid::new_v4();
        let principal = Principal {
            id: Uuid::new_v4(),
            organizations: vec![OrganizationMembership {
                organization_id: org,
                role_ids: vec![role],
            }],
            teams: vec![TeamMembership {
                team_id: team,
                organization_id: org,
                role_ids: vec![],
            }],
            auth_method: AuthMethod::Password,
        };

        assert!(principal.is_organization_member(org));
        assert!(!principal.is_organization_member(Uuid::new_v4()));
        assert!(principal.is_team_member(team));
        assert_eq!(principal.organization_role_ids(org), &[role]);
        assert!(principal.organization_role_ids(Uuid::new_v4()).is_empty());
    }
}
