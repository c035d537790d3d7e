//! Vault link model
//!
//! A vault link is a named URL owned by one user and labelled with an
//! access level. The label is metadata only; nothing here enforces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stored vault link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultLink {
    /// Generated identifier
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Target URL, always starting with "http"
    pub url: String,
    /// Display name
    pub name: String,
    /// Sharing label
    pub access_level: AccessLevel,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl VaultLink {
    /// Build a new link owned by `user_id` with a fresh id.
    pub fn new(
        user_id: String,
        url: String,
        name: String,
        access_level: AccessLevel,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            url,
            name,
            access_level,
            created_at: now,
        }
    }
}

/// Sharing label attached to a vault link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    #[default]
    Restricted,
    #[serde(rename = "Anyone with link")]
    AnyoneWithLink,
    Public,
}

impl AccessLevel {
    /// Every accepted access level, in display order
    pub const ALL: [AccessLevel; 3] = [
        AccessLevel::Restricted,
        AccessLevel::AnyoneWithLink,
        AccessLevel::Public,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Restricted => "Restricted",
            AccessLevel::AnyoneWithLink => "Anyone with link",
            AccessLevel::Public => "Public",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = anyhow::Error;

    /// Labels are matched exactly, including case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid access level: {}", s))
    }
}

/// Input for creating a vault link, as received from a client.
///
/// `access_level` stays a raw string so an unknown label can be reported as
/// a field-level validation error instead of a decoding failure. It may be
/// omitted, but an explicit `null` is rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVaultLinkInput {
    pub url: String,
    pub name: String,
    #[serde(default, deserialize_with = "non_null_access_level")]
    pub access_level: Option<String>,
}

/// Only called when the field is present, so `None` here means `null`.
fn non_null_access_level<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(level) => Ok(Some(level)),
        None => Err(serde::de::Error::custom("access_level must not be null")),
    }
}

impl CreateVaultLinkInput {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            access_level: None,
        }
    }

    pub fn with_access_level(mut self, access_level: impl Into<String>) -> Self {
        self.access_level = Some(access_level.into());
        self
    }
}
