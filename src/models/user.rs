//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user known to the vault, created on first login for an email.
///
/// Profile fields are written once and never updated by later logins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Generated identifier
    pub id: String,
    /// Email address (unique)
    pub email: String,
    /// Display name as reported by the identity provider
    pub name: String,
    /// Avatar URL, if the provider sent one
    pub picture: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Profile fields reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserProfile {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

impl User {
    /// Build a new user with a fresh id from a provider profile.
    pub fn new(profile: NewUserProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: profile.email,
            name: profile.name,
            picture: profile.picture,
            created_at: now,
        }
    }
}
