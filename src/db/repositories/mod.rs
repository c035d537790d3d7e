//! Database repositories
//!
//! One repository per stored entity. Services depend on the traits so tests
//! and alternative stores can be swapped in.

pub mod session;
pub mod user;
pub mod vault_link;

pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use vault_link::{SqlxVaultLinkRepository, VaultLinkRepository};
