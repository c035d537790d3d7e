//! Vault link service
//!
//! Create, list and delete links on behalf of a user already resolved by the
//! access guard. Every operation is scoped to that user.

use crate::db::repositories::VaultLinkRepository;
use crate::models::{AccessLevel, CreateVaultLinkInput, User, VaultLink};
use anyhow::Context;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;

/// Upper bound on the number of links returned by a listing
pub const MAX_LISTED_LINKS: i64 = 1000;

/// Error types for vault link operations
#[derive(Debug, thiserror::Error)]
pub enum VaultLinkError {
    /// A field of the input violates its constraint
    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: &'static str, message: String },

    /// No link with this id belongs to the caller
    #[error("Link not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl VaultLinkError {
    fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field,
            message: message.into(),
        }
    }
}

/// Vault link service
pub struct VaultLinkService {
    repo: Arc<dyn VaultLinkRepository>,
}

impl VaultLinkService {
    pub fn new(repo: Arc<dyn VaultLinkRepository>) -> Self {
        Self { repo }
    }

    /// Create a link owned by `owner`.
    ///
    /// Input is validated before anything is written. A missing access level
    /// defaults to `Restricted`.
    pub async fn create(
        &self,
        owner: &User,
        input: CreateVaultLinkInput,
    ) -> Result<VaultLink, VaultLinkError> {
        let access_level = validate_create_input(&input)?;

        let link = VaultLink::new(owner.id.clone(), input.url, input.name, access_level, Utc::now());
        let created = self
            .repo
            .create(&link)
            .await
            .context("Failed to create vault link")?;

        tracing::debug!(link_id = %created.id, user_id = %owner.id, "Created vault link");
        Ok(created)
    }

    /// Links owned by `owner`, newest first, capped at `MAX_LISTED_LINKS`.
    pub async fn list(&self, owner: &User) -> Result<Vec<VaultLink>, VaultLinkError> {
        let links = self
            .repo
            .list_by_user(&owner.id, MAX_LISTED_LINKS)
            .await
            .context("Failed to list vault links")?;
        Ok(links)
    }

    /// Delete one of `owner`'s links.
    ///
    /// A link that exists but belongs to someone else is reported as
    /// `NotFound`, same as one that does not exist.
    pub async fn delete(&self, owner: &User, link_id: &str) -> Result<(), VaultLinkError> {
        self.repo
            .get_for_user(link_id, &owner.id)
            .await
            .context("Failed to get vault link")?
            .ok_or(VaultLinkError::NotFound)?;

        // A concurrent delete of the same link also ends up here as NotFound.
        let removed = self
            .repo
            .delete_for_user(link_id, &owner.id)
            .await
            .context("Failed to delete vault link")?;
        if !removed {
            return Err(VaultLinkError::NotFound);
        }

        tracing::debug!(link_id, user_id = %owner.id, "Deleted vault link");
        Ok(())
    }
}

/// Check a create request and resolve its access level.
pub fn validate_create_input(input: &CreateVaultLinkInput) -> Result<AccessLevel, VaultLinkError> {
    if !input.url.starts_with("http") {
        return Err(VaultLinkError::validation(
            "url",
            "URL must start with http or https",
        ));
    }

    match input.access_level.as_deref() {
        None => Ok(AccessLevel::default()),
        Some(raw) => AccessLevel::from_str(raw).map_err(|_| {
            let allowed: Vec<&str> = AccessLevel::ALL.iter().map(|l| l.as_str()).collect();
            VaultLinkError::validation(
                "access_level",
                format!("Access level must be one of {:?}", allowed),
            )
        }),
    }
}
