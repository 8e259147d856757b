pub mod claims;
pub mod context;
pub mod permission_set;
pub mod principal;
pub mod role;

pub use claims::{TokenClaims, TokenKind};
pub use context::AuthorizationContext;
pub use permission_set::EffectivePermissionSet;
pub use principal::{AuthMethod, OrganizationMembership, Principal, TeamMembership};
pub use role::{PermissionGrant, Role, ScopeKind};
