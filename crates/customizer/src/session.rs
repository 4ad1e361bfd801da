//! One user editing one template.
//!
//! ```text
//! Seeded ──set_*──▶ Editing ──set_*──▶ Editing
//!    │                 │
//!    │                 ├──commit──▶ Committed
//!    └──discard────────┴──discard─▶ Discarded
//! ```
//!
//! Committed and Discarded are terminal. A failed commit leaves the session in
//! its previous state with the record untouched.

use crate::commit::{commit, CommitContext, CommitOutcome};
use crate::record::{CustomizationRecord, ImageRef, ScalarField};
use brandkit_core::config::CustomizerConfig;
use brandkit_core::event_bus::{failure_notification, make_notification};
use brandkit_core::{
    BrandProfile, BrandkitError, BrandkitResult, EventSink, NotificationKind, StalePolicy,
    TemplateDescriptor, UserId,
};
use brandkit_storage::{CustomizedTemplateRepository, ImageUpload, ObjectKey, UploadCapability};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Seeded,
    Editing,
    Committed,
    Discarded,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Committed | SessionState::Discarded)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Seeded => "seeded",
            SessionState::Editing => "editing",
            SessionState::Committed => "committed",
            SessionState::Discarded => "discarded",
        };
        f.write_str(s)
    }
}

/// Starts editing sessions against a shared set of backends.
#[derive(Clone)]
pub struct Customizer {
    repository: Arc<dyn CustomizedTemplateRepository>,
    uploader: Arc<dyn UploadCapability>,
    sink: Arc<dyn EventSink>,
    config: CustomizerConfig,
}

impl Customizer {
    pub fn new(
        repository: Arc<dyn CustomizedTemplateRepository>,
        uploader: Arc<dyn UploadCapability>,
        sink: Arc<dyn EventSink>,
        config: CustomizerConfig,
    ) -> Self {
        Self {
            repository,
            uploader,
            sink,
            config,
        }
    }

    pub fn stale_policy(&self) -> StalePolicy {
        self.config.stale_policy
    }

    /// Open a session on `template`, seeded from `profile`.
    pub fn start(
        &self,
        user: Option<&UserId>,
        template: TemplateDescriptor,
        profile: &BrandProfile,
    ) -> BrandkitResult<EditingSession> {
        let Some(user) = user else {
            let err = BrandkitError::NotAuthenticated;
            self.sink.emit(failure_notification(None, "start_session", &err));
            return Err(err);
        };
        let id = Uuid::new_v4();
        debug!(user_id = %user, template_id = %template.id, session_id = %id, "editing session started");
        Ok(EditingSession {
            id,
            user: user.clone(),
            record: CustomizationRecord::seed(profile),
            template,
            state: SessionState::Seeded,
            drafts: BTreeMap::new(),
            services: self.clone(),
        })
    }
}

pub struct EditingSession {
    /// Namespaces the session's uploaded images.
    id: Uuid,
    user: UserId,
    template: TemplateDescriptor,
    record: CustomizationRecord,
    state: SessionState,
    /// Bytes behind every `ImageRef::Draft`, keyed by element index.
    drafts: BTreeMap<u32, ImageUpload>,
    services: Customizer,
}

impl EditingSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn record(&self) -> &CustomizationRecord {
        &self.record
    }

    pub fn template(&self) -> &TemplateDescriptor {
        &self.template
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn set_field(&mut self, field: ScalarField, value: impl Into<String>) -> BrandkitResult<()> {
        self.edit(|record| record.set_field(field, value))
    }

    pub fn set_text(&mut self, index: u32, text: impl Into<String>) -> BrandkitResult<()> {
        self.edit(|record| record.set_text(index, text))
    }

    /// Place an image that is already retrievable at `url`. Replaces any
    /// draft pending at `index`. Drafts are only created through
    /// [`attach_draft_image`](Self::attach_draft_image).
    pub fn set_image(&mut self, index: u32, url: impl Into<String>) -> BrandkitResult<()> {
        self.edit(|record| record.set_image(index, ImageRef::Durable(url.into())))?;
        self.drafts.remove(&index);
        Ok(())
    }

    /// Keep `upload` in the session only and reference it as a draft. The
    /// record cannot be committed until [`resolve_drafts`](Self::resolve_drafts)
    /// has uploaded it.
    pub fn attach_draft_image(&mut self, index: u32, upload: ImageUpload) -> BrandkitResult<()> {
        let local_key = format!("draft://{index}/{}", upload.file_name);
        self.edit(|record| record.set_image(index, ImageRef::Draft(local_key)))?;
        self.drafts.insert(index, upload);
        Ok(())
    }

    /// Upload `upload` right away and place the resulting URL at `index`.
    pub async fn upload_image(&mut self, index: u32, upload: ImageUpload) -> BrandkitResult<()> {
        self.ensure_open()?;
        let url = match self.upload_element(index, &upload).await {
            Ok(url) => url,
            Err(err) => return Err(self.fail("upload_image", err)),
        };
        self.set_image(index, url)?;
        self.services.sink.emit(make_notification(
            NotificationKind::ImageAttached,
            Some(&self.user),
            Some(format!("{}#{index}", self.template.id)),
            "Image added to the template",
        ));
        Ok(())
    }

    /// Upload every pending draft and swap it for its durable URL. Stops at
    /// the first failure; drafts resolved before it stay resolved.
    pub async fn resolve_drafts(&mut self) -> BrandkitResult<usize> {
        self.ensure_open()?;
        let pending: Vec<u32> = self.drafts.keys().copied().collect();
        let mut resolved = 0;
        for index in pending {
            let Some(upload) = self.drafts.get(&index).cloned() else {
                continue;
            };
            let url = match self.upload_element(index, &upload).await {
                Ok(url) => url,
                Err(err) => return Err(self.fail("resolve_drafts", err)),
            };
            self.set_image(index, url)?;
            resolved += 1;
        }
        if resolved > 0 {
            info!(user_id = %self.user, template_id = %self.template.id, resolved, "draft images uploaded");
        }
        Ok(resolved)
    }

    /// Validate and persist the record. On success the session is closed.
    pub async fn commit(&mut self) -> BrandkitResult<CommitOutcome> {
        self.ensure_open()?;

        let context = CommitContext::for_template(
            self.user.clone(),
            &self.template,
            &self.services.config.name_suffix,
        );
        let result = commit(
            &self.record,
            &self.template.content_structure,
            &context,
            self.services.repository.as_ref(),
            self.services.config.stale_policy,
        )
        .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail("commit", err)),
        };

        self.state = SessionState::Committed;
        self.drafts.clear();

        let sink = &self.services.sink;
        if !outcome.dropped.is_empty() {
            let keys: Vec<String> = outcome.dropped.iter().map(ToString::to_string).collect();
            sink.emit(make_notification(
                NotificationKind::StaleKeysDropped,
                Some(&self.user),
                Some(self.template.id.clone()),
                format!("Ignored content that no longer fits the template: {}", keys.join(", ")),
            ));
        }
        sink.emit(make_notification(
            NotificationKind::TemplateSaved,
            Some(&self.user),
            Some(outcome.id.to_string()),
            format!("'{}' saved", context.name),
        ));
        Ok(outcome)
    }

    /// End the session without persisting anything.
    pub fn discard(&mut self) -> BrandkitResult<()> {
        self.ensure_open()?;
        self.state = SessionState::Discarded;
        self.drafts.clear();
        debug!(user_id = %self.user, template_id = %self.template.id, "editing session discarded");
        Ok(())
    }

    fn ensure_open(&self) -> BrandkitResult<()> {
        if self.state.is_terminal() {
            return Err(BrandkitError::SessionClosed(self.state.to_string()));
        }
        Ok(())
    }

    fn edit(
        &mut self,
        apply: impl FnOnce(CustomizationRecord) -> CustomizationRecord,
    ) -> BrandkitResult<()> {
        self.ensure_open()?;
        let record = std::mem::take(&mut self.record);
        self.record = apply(record);
        self.state = SessionState::Editing;
        Ok(())
    }

    async fn upload_element(&self, index: u32, upload: &ImageUpload) -> BrandkitResult<String> {
        let ext = upload.extension()?;
        let key = ObjectKey::element_image(&self.user, &self.template.id, self.id, index, &ext);
        self.services.uploader.upload(&key, upload).await
    }

    fn fail(&self, operation: &str, err: BrandkitError) -> BrandkitError {
        warn!(
            user_id = %self.user,
            template_id = %self.template.id,
            operation,
            error = %err,
            "customization operation failed"
        );
        self.services
            .sink
            .emit(failure_notification(Some(&self.user), operation, &err));
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use brandkit_core::config::UploadConfig;
    use brandkit_core::event_bus::{capture_sink, CaptureSink};
    use brandkit_core::{ContentElement, TemplateContentSchema};
    use brandkit_storage::{MemoryCustomizedTemplateRepository, MemoryObjectStore};

    struct Fixture {
        customizer: Customizer,
        repo: Arc<MemoryCustomizedTemplateRepository>,
        objects: Arc<MemoryObjectStore>,
        sink: Arc<CaptureSink>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryCustomizedTemplateRepository::new());
        let objects = Arc::new(MemoryObjectStore::new(UploadConfig::default()).unwrap());
        let sink = capture_sink();
        let customizer = Customizer::new(
            repo.clone(),
            objects.clone(),
            sink.clone(),
            CustomizerConfig::default(),
        );
        Fixture {
            customizer,
            repo,
            objects,
            sink,
        }
    }

    fn template() -> TemplateDescriptor {
        TemplateDescriptor {
            id: "ig-promo".into(),
            title: "Promo Post".into(),
            description: String::new(),
            platform: "Instagram".into(),
            template_type: "post".into(),
            category: "promotion".into(),
            premium: false,
            content_structure: TemplateContentSchema::new(vec![
                ContentElement::text(0, "Headline"),
                ContentElement::image(1),
            ])
            .unwrap(),
        }
    }

    fn user() -> UserId {
        UserId::parse("u1").unwrap()
    }

    fn session(f: &Fixture) -> EditingSession {
        f.customizer
            .start(Some(&user()), template(), &BrandProfile::default())
            .unwrap()
    }

    #[test]
    fn test_start_requires_identity() {
        let f = fixture();
        let err = f
            .customizer
            .start(None, template(), &BrandProfile::default())
            .err()
            .unwrap();
        assert!(matches!(err, BrandkitError::NotAuthenticated));
    }

    #[test]
    fn test_state_transitions() {
        let f = fixture();
        let mut s = session(&f);
        assert_eq!(s.state(), SessionState::Seeded);

        s.set_text(0, "Hi").unwrap();
        assert_eq!(s.state(), SessionState::Editing);
        s.set_field(ScalarField::FontSize, "20px").unwrap();
        assert_eq!(s.state(), SessionState::Editing);

        s.discard().unwrap();
        assert_eq!(s.state(), SessionState::Discarded);
        assert!(matches!(s.set_text(0, "again"), Err(BrandkitError::SessionClosed(_))));
        assert!(s.discard().is_err());
    }

    #[tokio::test]
    async fn test_commit_closes_session() {
        let f = fixture();
        let mut s = session(&f);
        s.set_text(0, "Hello").unwrap();

        let outcome = s.commit().await.unwrap();
        assert_eq!(s.state(), SessionState::Committed);
        assert_eq!(f.repo.len(), 1);
        assert_eq!(outcome.data.custom_texts[&0], "Hello");
        assert_eq!(f.sink.count_kind(NotificationKind::TemplateSaved), 1);

        assert!(matches!(s.commit().await, Err(BrandkitError::SessionClosed(_))));
        assert!(s.set_field(ScalarField::TextColor, "#000000").is_err());
        assert!(s.discard().is_err());
        assert_eq!(f.repo.len(), 1);
    }

    #[tokio::test]
    async fn test_discarded_session_never_persists() {
        let f = fixture();
        let mut s = session(&f);
        s.set_text(0, "Hello").unwrap();
        s.discard().unwrap();

        assert!(s.commit().await.is_err());
        assert!(f.repo.is_empty());
    }

    #[tokio::test]
    async fn test_transient_commit_failure_keeps_session_editable() {
        let f = fixture();
        let mut s = session(&f);
        s.set_text(0, "Hello").unwrap();
        f.repo.fail_next(1);

        let err = s.commit().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(s.state(), SessionState::Editing);
        assert_eq!(s.record().custom_texts[&0], "Hello");
        assert_eq!(f.sink.count_kind(NotificationKind::OperationFailed), 1);

        s.commit().await.unwrap();
        assert_eq!(f.repo.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_keys_dropped_with_warning() {
        let f = fixture();
        let mut s = session(&f);
        s.set_text(0, "Hello").unwrap();
        s.set_text(5, "orphan").unwrap();

        let outcome = s.commit().await.unwrap();
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(
            f.sink.kinds(),
            vec![NotificationKind::StaleKeysDropped, NotificationKind::TemplateSaved]
        );
    }

    #[tokio::test]
    async fn test_reject_policy_keeps_session_open() {
        let f = fixture();
        let customizer = Customizer::new(
            f.repo.clone(),
            f.objects.clone(),
            f.sink.clone(),
            CustomizerConfig {
                stale_policy: StalePolicy::Reject,
                ..CustomizerConfig::default()
            },
        );
        let mut s = customizer
            .start(Some(&user()), template(), &BrandProfile::default())
            .unwrap();
        s.set_text(5, "orphan").unwrap();

        let err = s.commit().await.unwrap_err();
        assert!(matches!(err, BrandkitError::StaleReference { .. }));
        assert_eq!(s.state(), SessionState::Editing);
        assert!(f.repo.is_empty());
    }

    #[tokio::test]
    async fn test_draft_must_be_resolved_before_commit() {
        let f = fixture();
        let mut s = session(&f);
        s.attach_draft_image(1, ImageUpload::new("photo.jpg", vec![7u8; 16]))
            .unwrap();
        assert!(s.record().custom_images[&1].is_draft());

        let err = s.commit().await.unwrap_err();
        assert!(matches!(err, BrandkitError::Validation(_)));
        assert!(f.objects.is_empty());

        assert_eq!(s.resolve_drafts().await.unwrap(), 1);
        let url = format!(
            "https://storage.local/brandkit/u1/templates/ig-promo/{}/1.jpg",
            s.id()
        );
        assert_eq!(s.record().custom_images[&1], ImageRef::durable(url.clone()));

        let outcome = s.commit().await.unwrap();
        assert_eq!(outcome.data.custom_images[&1], url);
    }

    #[tokio::test]
    async fn test_reattached_draft_uploads_latest_bytes() {
        let f = fixture();
        let mut s = session(&f);
        s.attach_draft_image(1, ImageUpload::new("old.png", vec![1u8]))
            .unwrap();
        s.attach_draft_image(1, ImageUpload::new("new.png", vec![2u8]))
            .unwrap();

        assert_eq!(s.resolve_drafts().await.unwrap(), 1);
        assert_eq!(f.objects.len(), 1);
        let key = format!("u1/templates/ig-promo/{}/1.png", s.id());
        assert_eq!(f.objects.get(&key).unwrap().bytes.as_ref(), &[2u8]);
        assert!(s.record().draft_indices().is_empty());
    }

    #[tokio::test]
    async fn test_set_image_only_places_durable_references() {
        let f = fixture();
        let mut s = session(&f);
        s.set_image(1, "blob://local").unwrap();

        assert_eq!(s.record().custom_images[&1], ImageRef::durable("blob://local"));
        assert_eq!(s.resolve_drafts().await.unwrap(), 0);
        let outcome = s.commit().await.unwrap();
        assert_eq!(outcome.data.custom_images[&1], "blob://local");
    }

    #[tokio::test]
    async fn test_replacing_draft_with_durable_forgets_bytes() {
        let f = fixture();
        let mut s = session(&f);
        s.attach_draft_image(1, ImageUpload::new("photo.jpg", vec![7u8]))
            .unwrap();
        s.set_image(1, "https://cdn/existing.png").unwrap();

        assert_eq!(s.resolve_drafts().await.unwrap(), 0);
        assert!(f.objects.is_empty());
    }

    #[tokio::test]
    async fn test_upload_image_is_durable_immediately() {
        let f = fixture();
        let mut s = session(&f);
        s.upload_image(1, ImageUpload::new("hero.webp", vec![1u8, 2]))
            .await
            .unwrap();

        assert!(!s.record().custom_images[&1].is_draft());
        let key = format!("u1/templates/ig-promo/{}/1.webp", s.id());
        assert!(f.objects.get(&key).is_some());
        assert_eq!(f.sink.count_kind(NotificationKind::ImageAttached), 1);
    }

    #[tokio::test]
    async fn test_rejected_upload_leaves_record_unchanged() {
        let f = fixture();
        let mut s = session(&f);
        let before = s.record().clone();

        let err = s
            .upload_image(1, ImageUpload::new("notes.txt", vec![1u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, BrandkitError::Upload(_)));
        assert_eq!(s.record(), &before);
        assert_eq!(f.sink.count_kind(NotificationKind::OperationFailed), 1);
    }
}
