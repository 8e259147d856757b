//! Role model - scoped permission bundles with optional precedence.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scope a role is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Organization,
    Team,
}

/// A single allow/deny grant for one permission key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub key: String,
    pub allow: bool,
}

impl PermissionGrant {
    pub fn allow(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            allow: true,
        }
    }

    pub fn deny(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            allow: false,
        }
    }
}

/// Named bundle of permission grants scoped to an organization or team.
///
/// `precedence` orders roles within the same scope when two of them grant
/// the same key; higher wins, and a tie (or no precedence at all) resolves
/// to deny.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub scope: ScopeKind,
    pub grants: Vec<PermissionGrant>,
    pub precedence: Option<i32>,
}

impl Role {
    pub fn new(name: impl Into<String>, scope: ScopeKind, grants: Vec<PermissionGrant>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            scope,
            grants,
            precedence: None,
        }
    }

    pub fn with_precedence(mut self, precedence: i32) -> Self {
        self.precedence = Some(precedence);
        self
    }
}
