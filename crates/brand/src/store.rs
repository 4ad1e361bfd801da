use brandkit_core::event_bus::{failure_notification, make_notification};
use brandkit_core::{
    AttemptTracker, BrandProfile, BrandProfileUpdate, BrandkitError, BrandkitResult, EventSink,
    NotificationKind, UserId,
};
use brandkit_storage::{BrandProfileRepository, ImageUpload, ObjectKey, UploadCapability};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Holds the currently-known brand profile of each user on top of a
/// [`BrandProfileRepository`].
///
/// The user identity is an explicit argument of every call; `None` stands for
/// a caller without identity. Backend failures never touch the held profile.
pub struct BrandProfileStore {
    repository: Arc<dyn BrandProfileRepository>,
    uploader: Arc<dyn UploadCapability>,
    sink: Arc<dyn EventSink>,
    held: DashMap<UserId, BrandProfile>,
    attempts: DashMap<UserId, Arc<AttemptTracker>>,
}

impl BrandProfileStore {
    pub fn new(
        repository: Arc<dyn BrandProfileRepository>,
        uploader: Arc<dyn UploadCapability>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            repository,
            uploader,
            sink,
            held: DashMap::new(),
            attempts: DashMap::new(),
        }
    }

    /// The held profile for `user`, or the defaults when nothing has been
    /// loaded or saved yet.
    pub fn current(&self, user: &UserId) -> BrandProfile {
        self.held
            .get(user)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Fetch the user's profile. A user without a stored profile gets the
    /// defaults; nothing is created.
    ///
    /// If a newer `load` or `save` for the same user starts while this one is
    /// in flight, the fetched profile is returned but not kept.
    pub async fn load(&self, user: Option<&UserId>) -> BrandkitResult<BrandProfile> {
        let Some(user) = user else {
            return Err(self.fail(None, "load", BrandkitError::NotAuthenticated));
        };

        let tracker = self.tracker(user);
        let attempt = tracker.begin();

        let profile = match self.repository.find_by_user(user).await {
            Ok(found) => found.unwrap_or_default(),
            Err(err) => return Err(self.fail(Some(user), "load", err)),
        };

        if tracker.is_current(attempt) {
            self.held.insert(user.clone(), profile.clone());
            debug!(user_id = %user, persisted = profile.id.is_some(), "brand profile loaded");
        } else {
            debug!(
                user_id = %user,
                attempt = attempt.sequence(),
                "discarding superseded brand profile load"
            );
        }
        Ok(profile)
    }

    /// Merge `update` over the held profile and upsert the result: insert when
    /// the profile has never been persisted, update by id otherwise.
    ///
    /// Concurrent saves are not serialized: whichever completes last decides
    /// both the stored and the held profile.
    pub async fn save(
        &self,
        user: Option<&UserId>,
        update: BrandProfileUpdate,
    ) -> BrandkitResult<BrandProfile> {
        let Some(user) = user else {
            return Err(self.fail(
                None,
                "save",
                BrandkitError::Validation("user not identified".into()),
            ));
        };
        self.persist(user, update, NotificationKind::BrandSaved).await
    }

    /// Upload a new logo to `{user}/logo`, replacing any previous one whatever
    /// its file type, and record its URL through the same merge path as
    /// [`save`](Self::save).
    pub async fn set_logo(
        &self,
        user: Option<&UserId>,
        upload: ImageUpload,
    ) -> BrandkitResult<BrandProfile> {
        let Some(user) = user else {
            return Err(self.fail(None, "set_logo", BrandkitError::NotAuthenticated));
        };

        let key = ObjectKey::logo(user);
        let url = match self.uploader.upload(&key, &upload).await {
            Ok(url) => url,
            Err(err) => return Err(self.fail(Some(user), "set_logo", err)),
        };
        info!(user_id = %user, key = %key, "logo uploaded");

        self.persist(user, BrandProfileUpdate::logo(url), NotificationKind::LogoUploaded)
            .await
    }

    async fn persist(
        &self,
        user: &UserId,
        update: BrandProfileUpdate,
        kind: NotificationKind,
    ) -> BrandkitResult<BrandProfile> {
        // Supersedes any load still in flight.
        self.tracker(user).begin();

        let merged = self.current(user).merged(&update);
        let result = match merged.id {
            Some(id) => self
                .repository
                .update(user, id, &merged)
                .await
                .map(|()| merged),
            None => self.repository.insert(user, &merged).await,
        };

        let saved = match result {
            Ok(saved) => saved,
            Err(err) => return Err(self.fail(Some(user), "save", err)),
        };

        self.held.insert(user.clone(), saved.clone());
        metrics::counter!("brand.save").increment(1);
        info!(
            user_id = %user,
            profile_id = ?saved.id,
            primary_color = %saved.primary_color,
            font_family = %saved.font_family,
            "brand profile saved"
        );

        let message = match kind {
            NotificationKind::LogoUploaded => "Logo uploaded and applied to your brand",
            _ => "Brand settings saved",
        };
        self.sink
            .emit(make_notification(kind, Some(user), None, message));
        Ok(saved)
    }

    fn tracker(&self, user: &UserId) -> Arc<AttemptTracker> {
        self.attempts.entry(user.clone()).or_default().value().clone()
    }

    fn fail(&self, user: Option<&UserId>, operation: &str, err: BrandkitError) -> BrandkitError {
        match &err {
            BrandkitError::Upload(reason) => {
                warn!(user_id = ?user.map(UserId::as_str), operation, reason = %reason, "upload rejected")
            }
            other => warn!(user_id = ?user.map(UserId::as_str), operation, error = %other, "brand operation failed"),
        }
        self.sink.emit(failure_notification(user, operation, &err));
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use brandkit_core::config::UploadConfig;
    use brandkit_core::event_bus::{capture_sink, CaptureSink};
    use brandkit_core::{FontFamily, HexColor};
    use brandkit_storage::{MemoryBrandProfileRepository, MemoryObjectStore};

    struct Fixture {
        store: BrandProfileStore,
        repo: Arc<MemoryBrandProfileRepository>,
        objects: Arc<MemoryObjectStore>,
        sink: Arc<CaptureSink>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryBrandProfileRepository::new());
        let objects = Arc::new(MemoryObjectStore::new(UploadConfig::default()).unwrap());
        let sink = capture_sink();
        let store = BrandProfileStore::new(repo.clone(), objects.clone(), sink.clone());
        Fixture {
            store,
            repo,
            objects,
            sink,
        }
    }

    fn user() -> UserId {
        UserId::parse("user-1").unwrap()
    }

    fn color(hex: &str) -> BrandProfileUpdate {
        BrandProfileUpdate {
            primary_color: Some(HexColor::parse(hex).unwrap()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_without_profile_returns_defaults_without_creating() {
        let f = fixture();
        let profile = f.store.load(Some(&user())).await.unwrap();

        assert_eq!(profile, BrandProfile::default());
        assert!(f.repo.stored(&user()).is_none());
        assert!(f.repo.write_log().is_empty());
    }

    #[tokio::test]
    async fn test_load_requires_identity() {
        let f = fixture();
        let err = f.store.load(None).await.unwrap_err();
        assert!(matches!(err, BrandkitError::NotAuthenticated));
        assert_eq!(f.sink.count_kind(NotificationKind::OperationFailed), 1);
    }

    #[tokio::test]
    async fn test_load_backend_failure_keeps_held_profile() {
        let f = fixture();
        f.store.save(Some(&user()), color("#111111")).await.unwrap();
        f.repo.fail_next(1);

        let err = f.store.load(Some(&user())).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(f.store.current(&user()).primary_color.as_str(), "#111111");
    }

    #[tokio::test]
    async fn test_first_save_inserts_then_updates_by_id() {
        let f = fixture();
        let first = f.store.save(Some(&user()), color("#000000")).await.unwrap();
        let id = first.id.unwrap();

        let second = f
            .store
            .save(
                Some(&user()),
                BrandProfileUpdate {
                    font_family: Some(FontFamily::Montserrat),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(second.id, Some(id));
        assert_eq!(second.primary_color.as_str(), "#000000");
        assert_eq!(second.font_family, FontFamily::Montserrat);
        assert_eq!(second.secondary_color.as_str(), "#EC4899");
        assert_eq!(f.repo.stored(&user()).unwrap(), second);
        assert_eq!(f.sink.count_kind(NotificationKind::BrandSaved), 2);
    }

    #[tokio::test]
    async fn test_save_without_identity_is_a_validation_error() {
        let f = fixture();
        let err = f.store.save(None, color("#000000")).await.unwrap_err();
        assert!(matches!(err, BrandkitError::Validation(_)));
        assert!(f.repo.write_log().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_local_state_untouched() {
        let f = fixture();
        f.store.save(Some(&user()), color("#111111")).await.unwrap();
        f.repo.fail_next(1);

        let err = f.store.save(Some(&user()), color("#222222")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(f.store.current(&user()).primary_color.as_str(), "#111111");
        assert_eq!(f.repo.stored(&user()).unwrap().primary_color.as_str(), "#111111");

        let retried = f.store.save(Some(&user()), color("#222222")).await.unwrap();
        assert_eq!(retried.primary_color.as_str(), "#222222");
    }

    #[tokio::test]
    async fn test_concurrent_saves_last_to_complete_wins() {
        let f = fixture();
        let u = user();

        let (a, b) = tokio::join!(
            f.store.save(Some(&u), color("#000000")),
            f.store.save(Some(&u), color("#FFFFFF")),
        );
        a.unwrap();
        b.unwrap();

        let log = f.repo.write_log();
        let (_, last_written) = log.last().unwrap();
        let stored = f.repo.stored(&u).unwrap();
        assert_eq!(&stored, last_written);
        assert_eq!(f.store.current(&u), stored);
        assert!(["#000000", "#FFFFFF"].contains(&stored.primary_color.as_str()));
        // Still exactly one profile, with a single id.
        assert!(log.iter().all(|(_, p)| p.id == stored.id));
    }

    #[tokio::test]
    async fn test_superseded_load_is_not_kept() {
        let f = fixture();
        let u = user();
        f.store.save(Some(&u), color("#111111")).await.unwrap();

        // The load reads "#111111"; the save started after it lands "#222222"
        // and must not be clobbered when the load resolves.
        let (loaded, saved) = tokio::join!(
            f.store.load(Some(&u)),
            f.store.save(Some(&u), color("#222222")),
        );
        loaded.unwrap();
        saved.unwrap();

        assert_eq!(f.store.current(&u).primary_color.as_str(), "#222222");
    }

    #[tokio::test]
    async fn test_set_logo_uploads_and_merges_url() {
        let f = fixture();
        f.store.save(Some(&user()), color("#123456")).await.unwrap();

        let profile = f
            .store
            .set_logo(Some(&user()), ImageUpload::new("brand.PNG", vec![1u8, 2, 3]))
            .await
            .unwrap();

        assert_eq!(
            profile.logo_url.as_deref(),
            Some("https://storage.local/brandkit/user-1/logo")
        );
        assert_eq!(profile.primary_color.as_str(), "#123456");
        assert_eq!(f.objects.get("user-1/logo").unwrap().content_type, "image/png");
        assert_eq!(f.sink.count_kind(NotificationKind::LogoUploaded), 1);
    }

    #[tokio::test]
    async fn test_set_logo_replaces_previous_object() {
        let f = fixture();
        let u = user();
        f.store
            .set_logo(Some(&u), ImageUpload::new("a.svg", vec![1u8]))
            .await
            .unwrap();
        f.store
            .set_logo(Some(&u), ImageUpload::new("b.svg", vec![2u8]))
            .await
            .unwrap();

        assert_eq!(f.objects.len(), 1);
        assert_eq!(f.objects.get("user-1/logo").unwrap().bytes.as_ref(), &[2u8]);
    }

    #[tokio::test]
    async fn test_set_logo_with_new_file_type_keeps_single_object() {
        let f = fixture();
        let u = user();
        let first = f
            .store
            .set_logo(Some(&u), ImageUpload::new("a.png", vec![1u8]))
            .await
            .unwrap();
        let second = f
            .store
            .set_logo(Some(&u), ImageUpload::new("b.svg", vec![2u8]))
            .await
            .unwrap();

        assert_eq!(f.objects.len(), 1);
        assert_eq!(first.logo_url, second.logo_url);
        let stored = f.objects.get("user-1/logo").unwrap();
        assert_eq!(stored.bytes.as_ref(), &[2u8]);
        assert_eq!(stored.content_type, "image/svg+xml");
    }

    #[tokio::test]
    async fn test_rejected_logo_is_reported_and_not_saved() {
        let f = fixture();
        let err = f
            .store
            .set_logo(Some(&user()), ImageUpload::new("logo.bmp", vec![1u8]))
            .await
            .unwrap_err();

        assert!(matches!(err, BrandkitError::Upload(_)));
        assert!(!err.is_retryable());
        assert!(f.repo.write_log().is_empty());
        assert!(f.store.current(&user()).logo_url.is_none());
        assert_eq!(f.sink.count_kind(NotificationKind::OperationFailed), 1);
    }

    #[tokio::test]
    async fn test_set_logo_requires_identity() {
        let f = fixture();
        let err = f
            .store
            .set_logo(None, ImageUpload::new("logo.png", vec![1u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, BrandkitError::NotAuthenticated));
        assert!(f.objects.is_empty());
    }
}
