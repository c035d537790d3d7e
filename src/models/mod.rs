//! Data models
//!
//! Stored entities (User, Session, VaultLink) and the inputs used to create
//! them.

mod session;
mod user;
mod vault_link;

pub use session::Session;
pub use user::{NewUserProfile, User};
pub use vault_link::{AccessLevel, CreateVaultLinkInput, VaultLink};
