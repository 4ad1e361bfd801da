use async_trait::async_trait;
use brandkit_core::{BrandProfile, BrandkitResult, ProfileId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Durable brand profile storage, one row per user.
#[async_trait]
pub trait BrandProfileRepository: Send + Sync {
    async fn find_by_user(&self, user: &UserId) -> BrandkitResult<Option<BrandProfile>>;

    /// Create the user's profile and return it with its assigned id.
    ///
    /// The user is the conflict key: inserting for a user that already has a
    /// profile overwrites it and keeps the existing id.
    async fn insert(&self, user: &UserId, profile: &BrandProfile) -> BrandkitResult<BrandProfile>;

    /// Overwrite the profile stored under `id`.
    async fn update(&self, user: &UserId, id: ProfileId, profile: &BrandProfile)
        -> BrandkitResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomizedTemplateId(pub Uuid);

impl CustomizedTemplateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomizedTemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CustomizedTemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable creation request for a committed customization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCustomizedTemplate {
    pub user_id: UserId,
    pub original_template_id: String,
    pub name: String,
    pub platform: String,
    #[serde(rename = "type")]
    pub template_type: String,
    pub customization_data: serde_json::Value,
}

/// A persisted customization, as re-fetched from the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizedTemplate {
    pub id: CustomizedTemplateId,
    pub user_id: UserId,
    pub original_template_id: String,
    pub name: String,
    pub platform: String,
    #[serde(rename = "type")]
    pub template_type: String,
    pub customization_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Insert-only store for committed customizations.
#[async_trait]
pub trait CustomizedTemplateRepository: Send + Sync {
    async fn create(&self, request: CreateCustomizedTemplate)
        -> BrandkitResult<CustomizedTemplateId>;

    async fn get(&self, id: CustomizedTemplateId) -> BrandkitResult<Option<CustomizedTemplate>>;

    /// Newest first.
    async fn list_for_user(&self, user: &UserId) -> BrandkitResult<Vec<CustomizedTemplate>>;
}
