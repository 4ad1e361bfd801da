//! In-memory implementations of the storage capabilities, backed by DashMap.
//!
//! Each one yields to the scheduler before touching its maps so that callers
//! racing on the same tokio task interleave the way they would against a real
//! backend. `fail_next` turns the next N calls into transient I/O failures.

use crate::repository::{
    BrandProfileRepository, CreateCustomizedTemplate, CustomizedTemplate, CustomizedTemplateId,
    CustomizedTemplateRepository,
};
use crate::upload::{ImageUpload, ObjectKey, ObjectKind, UploadCapability};
use async_trait::async_trait;
use brandkit_core::config::UploadConfig;
use brandkit_core::{BrandProfile, BrandkitError, BrandkitResult, ProfileId, UserId};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Counts down injected failures.
#[derive(Debug, Default)]
pub struct FailureInjector {
    remaining: AtomicUsize,
}

impl FailureInjector {
    pub fn fail_next(&self, calls: usize) {
        self.remaining.store(calls, Ordering::SeqCst);
    }

    pub fn check(&self, operation: &str) -> BrandkitResult<()> {
        let tripped = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            warn!(operation, "injected backend failure");
            return Err(BrandkitError::TransientIo(format!(
                "{operation}: backend unavailable"
            )));
        }
        Ok(())
    }
}

// ─── Brand profiles ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryBrandProfileRepository {
    profiles: DashMap<UserId, BrandProfile>,
    writes: Mutex<Vec<(UserId, BrandProfile)>>,
    failures: FailureInjector,
}

impl MemoryBrandProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, calls: usize) {
        self.failures.fail_next(calls);
    }

    /// Every successful write, in the order it landed.
    pub fn write_log(&self) -> Vec<(UserId, BrandProfile)> {
        self.writes.lock().clone()
    }

    pub fn stored(&self, user: &UserId) -> Option<BrandProfile> {
        self.profiles.get(user).map(|r| r.value().clone())
    }

    fn record_write(&self, user: &UserId, profile: &BrandProfile) {
        self.profiles.insert(user.clone(), profile.clone());
        self.writes.lock().push((user.clone(), profile.clone()));
    }
}

#[async_trait]
impl BrandProfileRepository for MemoryBrandProfileRepository {
    async fn find_by_user(&self, user: &UserId) -> BrandkitResult<Option<BrandProfile>> {
        tokio::task::yield_now().await;
        self.failures.check("brand_profile.find_by_user")?;
        Ok(self.stored(user))
    }

    async fn insert(&self, user: &UserId, profile: &BrandProfile) -> BrandkitResult<BrandProfile> {
        tokio::task::yield_now().await;
        self.failures.check("brand_profile.insert")?;

        let id = self
            .profiles
            .get(user)
            .and_then(|existing| existing.id)
            .unwrap_or_default();
        let stored = BrandProfile {
            id: Some(id),
            ..profile.clone()
        };
        self.record_write(user, &stored);
        debug!(user_id = %user, profile_id = %id, "brand profile inserted");
        Ok(stored)
    }

    async fn update(
        &self,
        user: &UserId,
        id: ProfileId,
        profile: &BrandProfile,
    ) -> BrandkitResult<()> {
        tokio::task::yield_now().await;
        self.failures.check("brand_profile.update")?;

        let owned = self
            .profiles
            .get(user)
            .is_some_and(|existing| existing.id == Some(id));
        if !owned {
            return Err(BrandkitError::Validation(format!(
                "brand profile {id} does not belong to user {user}"
            )));
        }
        let stored = BrandProfile {
            id: Some(id),
            ..profile.clone()
        };
        self.record_write(user, &stored);
        debug!(user_id = %user, profile_id = %id, "brand profile updated");
        Ok(())
    }
}

// ─── Customized templates ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCustomizedTemplateRepository {
    templates: DashMap<CustomizedTemplateId, CustomizedTemplate>,
    failures: FailureInjector,
}

impl MemoryCustomizedTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, calls: usize) {
        self.failures.fail_next(calls);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[async_trait]
impl CustomizedTemplateRepository for MemoryCustomizedTemplateRepository {
    async fn create(
        &self,
        request: CreateCustomizedTemplate,
    ) -> BrandkitResult<CustomizedTemplateId> {
        tokio::task::yield_now().await;
        self.failures.check("customized_template.create")?;

        let id = CustomizedTemplateId::new();
        let template = CustomizedTemplate {
            id,
            user_id: request.user_id,
            original_template_id: request.original_template_id,
            name: request.name,
            platform: request.platform,
            template_type: request.template_type,
            customization_data: request.customization_data,
            created_at: Utc::now(),
        };
        info!(
            id = %id,
            user_id = %template.user_id,
            template_id = %template.original_template_id,
            "customized template stored"
        );
        self.templates.insert(id, template);
        Ok(id)
    }

    async fn get(&self, id: CustomizedTemplateId) -> BrandkitResult<Option<CustomizedTemplate>> {
        tokio::task::yield_now().await;
        self.failures.check("customized_template.get")?;
        Ok(self.templates.get(&id).map(|r| r.value().clone()))
    }

    async fn list_for_user(&self, user: &UserId) -> BrandkitResult<Vec<CustomizedTemplate>> {
        tokio::task::yield_now().await;
        self.failures.check("customized_template.list_for_user")?;
        let mut templates: Vec<CustomizedTemplate> = self
            .templates
            .iter()
            .filter(|r| &r.value().user_id == user)
            .map(|r| r.value().clone())
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }
}

// ─── Object store ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub uploaded_at: DateTime<Utc>,
}

/// Overwrite-on-conflict object store that enforces the configured size and
/// extension limits.
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
    base_url: String,
    config: UploadConfig,
    failures: FailureInjector,
}

impl MemoryObjectStore {
    pub fn new(config: UploadConfig) -> BrandkitResult<Self> {
        let parsed = url::Url::parse(&config.public_base_url).map_err(|e| {
            BrandkitError::Config(format!(
                "invalid upload.public_base_url '{}': {e}",
                config.public_base_url
            ))
        })?;
        Ok(Self {
            objects: DashMap::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            config,
            failures: FailureInjector::default(),
        })
    }

    pub fn fail_next(&self, calls: usize) {
        self.failures.fail_next(calls);
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn check_asset(&self, key: &ObjectKey, upload: &ImageUpload) -> BrandkitResult<()> {
        let ext = upload.extension()?;
        if !self.config.allowed_extensions.iter().any(|a| a == &ext) {
            return Err(BrandkitError::Upload(format!(
                "file type '.{ext}' is not allowed"
            )));
        }
        if upload.is_empty() {
            return Err(BrandkitError::Upload(format!(
                "'{}' is empty",
                upload.file_name
            )));
        }
        let limit = match key.kind() {
            ObjectKind::Logo => self.config.max_logo_bytes,
            ObjectKind::ElementImage => self.config.max_image_bytes,
        };
        if upload.len() > limit {
            return Err(BrandkitError::Upload(format!(
                "'{}' is {} bytes, limit is {limit}",
                upload.file_name,
                upload.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UploadCapability for MemoryObjectStore {
    async fn upload(&self, key: &ObjectKey, upload: &ImageUpload) -> BrandkitResult<String> {
        tokio::task::yield_now().await;
        self.failures.check("object_store.upload")?;
        self.check_asset(key, upload)?;

        let replaced = self
            .objects
            .insert(
                key.as_str().to_string(),
                StoredObject {
                    bytes: upload.bytes.clone(),
                    content_type: upload.content_type(),
                    uploaded_at: Utc::now(),
                },
            )
            .is_some();
        debug!(key = %key, bytes = upload.len(), replaced, "object stored");
        Ok(format!("{}/{}", self.base_url, key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use brandkit_core::HexColor;
    use serde_json::json;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_profile_insert_assigns_id_and_is_unique_per_user() {
        let repo = MemoryBrandProfileRepository::new();
        let u = user("u1");

        let first = repo.insert(&u, &BrandProfile::default()).await.unwrap();
        let id = first.id.unwrap();

        let recolored = BrandProfile {
            primary_color: HexColor::parse("#000000").unwrap(),
            ..BrandProfile::default()
        };
        let second = repo.insert(&u, &recolored).await.unwrap();
        assert_eq!(second.id, Some(id));
        assert_eq!(repo.stored(&u).unwrap().primary_color.as_str(), "#000000");
        assert_eq!(repo.write_log().len(), 2);
    }

    #[tokio::test]
    async fn test_profile_update_requires_matching_id() {
        let repo = MemoryBrandProfileRepository::new();
        let u = user("u1");
        let stored = repo.insert(&u, &BrandProfile::default()).await.unwrap();

        repo.update(&u, stored.id.unwrap(), &stored).await.unwrap();
        let err = repo.update(&u, ProfileId::new(), &stored).await.unwrap_err();
        assert!(matches!(err, BrandkitError::Validation(_)));
    }

    #[tokio::test]
    async fn test_injected_failures_are_transient_and_bounded() {
        let repo = MemoryBrandProfileRepository::new();
        let u = user("u1");
        repo.fail_next(2);

        assert!(repo.find_by_user(&u).await.unwrap_err().is_retryable());
        assert!(repo.find_by_user(&u).await.unwrap_err().is_retryable());
        assert!(repo.find_by_user(&u).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_customized_templates_listed_per_user() {
        let repo = MemoryCustomizedTemplateRepository::new();
        let request = |u: &str| CreateCustomizedTemplate {
            user_id: user(u),
            original_template_id: "ig-post".into(),
            name: "Promo - Customized".into(),
            platform: "Instagram".into(),
            template_type: "post".into(),
            customization_data: json!({"backgroundColor": "#8B5CF6"}),
        };

        let id = repo.create(request("a")).await.unwrap();
        repo.create(request("a")).await.unwrap();
        repo.create(request("b")).await.unwrap();

        assert_eq!(repo.list_for_user(&user("a")).await.unwrap().len(), 2);
        let fetched = repo.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.customization_data["backgroundColor"], "#8B5CF6");
        assert!(repo.get(CustomizedTemplateId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_object_store_overwrites_and_builds_url() {
        let store = MemoryObjectStore::new(UploadConfig::default()).unwrap();
        let key = ObjectKey::logo(&user("u1"));

        let url = store
            .upload(&key, &ImageUpload::new("logo.png", vec![1u8, 2, 3]))
            .await
            .unwrap();
        assert_eq!(url, "https://storage.local/brandkit/u1/logo");

        store
            .upload(&key, &ImageUpload::new("logo.svg", vec![9u8]))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        let stored = store.get("u1/logo").unwrap();
        assert_eq!(stored.bytes.as_ref(), &[9]);
        assert_eq!(stored.content_type, "image/svg+xml");
    }

    #[tokio::test]
    async fn test_object_store_rejects_bad_assets() {
        let config = UploadConfig {
            max_logo_bytes: 4,
            ..UploadConfig::default()
        };
        let store = MemoryObjectStore::new(config).unwrap();
        let u = user("u1");

        let too_big = store
            .upload(&ObjectKey::logo(&u), &ImageUpload::new("l.png", vec![0u8; 5]))
            .await
            .unwrap_err();
        assert!(matches!(too_big, BrandkitError::Upload(_)));

        let bad_type = store
            .upload(&ObjectKey::logo(&u), &ImageUpload::new("l.exe", vec![0u8]))
            .await
            .unwrap_err();
        assert!(matches!(bad_type, BrandkitError::Upload(_)));

        let empty = store
            .upload(&ObjectKey::logo(&u), &ImageUpload::new("l.png", Vec::<u8>::new()))
            .await
            .unwrap_err();
        assert!(matches!(empty, BrandkitError::Upload(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_object_store_rejects_invalid_base_url() {
        let config = UploadConfig {
            public_base_url: "not a url".into(),
            ..UploadConfig::default()
        };
        assert!(matches!(
            MemoryObjectStore::new(config),
            Err(BrandkitError::Config(_))
        ));
    }
}
