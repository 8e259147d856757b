//! Services layer for the authorization engine.
//!
//! Codec, revocation, resolution, context switching, and the token service
//! that composes them.

pub mod cache;
mod codec;
mod context;
mod directory;
pub mod error;
mod resolver;
mod revocation;
mod token;

pub use cache::{InMemoryCache, RedisCache, SharedCache};
pub use codec::{ClaimCodec, SealedCodec, SignedCodec};
pub use context::{AvailableOrganization, ContextManager};
pub use directory::{DirectoryStore, InMemoryDirectory, Memberships};
pub use error::AuthzError;
pub use resolver::PermissionResolver;
pub use revocation::RevocationStore;
pub use token::{TokenPair, TokenService};
