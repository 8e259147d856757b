//! Authorization context - the (organization, team) scope active for a session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Active scope embedded in every token.
///
/// The team, when present, belongs to the stated organization, and the
/// principal holds membership in both. Instances are only produced by
/// `ContextManager` after those checks pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    pub organization_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
}

impl AuthorizationContext {
    /// Organization-only context (no active team).
    pub fn organization(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            team_id: None,
        }
    }

    /// Context with an active team inside the organization.
    pub fn team(organization_id: Uuid, team_id: Uuid) -> Self {
        Self {
            organization_id,
            team_id: Some(team_id),
        }
    }
}
