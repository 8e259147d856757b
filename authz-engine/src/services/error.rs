use thiserror::Error;

/// Error taxonomy for the authorization engine.
///
/// Every variant is terminal for the current operation; retries belong to
/// the calling layer. On ambiguity (unreachable cache, partial decode) the
/// engine denies rather than grants.
#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Token signature invalid")]
    SignatureInvalid,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token revoked")]
    Revoked,

    #[error("Wrong token kind: expected {expected}, got {actual}")]
    WrongTokenKind {
        expected: crate::models::TokenKind,
        actual: crate::models::TokenKind,
    },

    #[error("Access denied")]
    AccessDenied,

    #[error("Not a member of the organization")]
    NotMember,

    #[error("Team does not belong to the organization")]
    TeamNotInOrganization,

    #[error("Permission resolution unavailable: {0}")]
    ResolutionUnavailable(#[source] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[source] anyhow::Error),
}

impl AuthzError {
    /// Cache or directory transport failure: deny, never grant.
    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        AuthzError::ResolutionUnavailable(err.into())
    }
}

impl From<redis::RedisError> for AuthzError {
    fn from(err: redis::RedisError) -> Self {
        AuthzError::unavailable(err)
    }
}
