//! Services layer - Business logic
//!
//! Services implement the rules of the vault on top of the repositories:
//! - resolving session tokens to users
//! - bootstrapping local sessions from the identity provider
//! - owner-scoped vault link operations

pub mod access;
pub mod auth;
pub mod identity;
pub mod vault_link;

pub use access::{AccessError, AccessGuard};
pub use auth::{AuthError, AuthService, AuthSession};
pub use identity::{HttpIdentityProvider, IdentityError, IdentityProvider, ProviderSession};
pub use vault_link::{VaultLinkError, VaultLinkService, MAX_LISTED_LINKS};
