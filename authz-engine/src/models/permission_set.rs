//! Effective permission set - the computed allow/deny map for one scope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Final permission key -> granted mapping for a (principal, org, team)
/// triple. Absent keys are denied.
///
/// Team-scoped grants override organization-scoped grants for the same key
/// (override, not union), so a team deny always beats an organization allow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissionSet {
    grants: BTreeMap<String, bool>,
}

impl EffectivePermissionSet {
    /// Aggregate organization- and team-scoped roles into the effective set.
    pub fn from_scopes(organization_roles: &[Role], team_roles: &[Role]) -> Self {
        let mut grants = fold_scope(organization_roles);
        // Team scope overlays the organization scope per key.
        for (key, allow) in fold_scope(team_roles) {
            grants.insert(key, allow);
        }
        Self { grants }
    }

    /// Fail-closed lookup: unknown keys are denied.
    pub fn is_allowed(&self, key: &str) -> bool {
        self.grants.get(key).copied().unwrap_or(false)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.grants.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.grants.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: &[(&str, bool)]) -> Self {
        Self {
            grants: entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

/// Merge all roles of a single scope. Conflicts on a key are settled by
/// precedence rank (higher wins); a tie or unranked conflict settles to deny.
fn fold_scope(roles: &[Role]) -> BTreeMap<String, bool> {
    let mut merged: BTreeMap<String, (bool, Option<i32>)> = BTreeMap::new();

    for role in roles {
        for grant in &role.grants {
            match merged.get(&grant.key) {
                None => {
                    merged.insert(grant.key.clone(), (grant.allow, role.precedence));
                }
                Some(&(existing_allow, existing_rank)) => {
                    let resolved = match (role.precedence, existing_rank) {
                        (Some(new), Some(old)) if new > old => (grant.allow, role.precedence),
                        (Some(new), Some(old)) if new < old => (existing_allow, existing_rank),
                        (Some(_), None) => (grant.allow, role.precedence),
                        (None, Some(_)) => (existing_allow, existing_rank),
                        // Tied or both unranked: deny wins.
                        _ => (existing_allow && grant.allow, existing_rank),
                    };
                    merged.insert(grant.key.clone(), resolved);
                }
            }
        }
    }

    merged.into_iter().map(|(k, (allow, _))| (k, allow)).collect()
}
