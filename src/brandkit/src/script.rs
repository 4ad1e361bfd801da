//! Replayable editing sessions.
//!
//! A script names a user and a template, optionally updates the brand first,
//! then applies a list of edits and commits:
//!
//! ```json
//! {
//!   "user_id": "acme",
//!   "template_id": "instagram-promo-post",
//!   "brand": { "primary_color": "#0052CC", "font_family": "Open Sans" },
//!   "logo": "assets/logo.svg",
//!   "edits": [
//!     { "op": "set_field", "field": "fontSize", "value": "24px" },
//!     { "op": "set_text", "index": 0, "value": "Summer sale" },
//!     { "op": "set_image", "index": 1, "url": "https://cdn.example.com/hero.png" },
//!     { "op": "upload_image", "index": 1, "path": "assets/hero.png" },
//!     { "op": "attach_draft", "index": 1, "path": "assets/hero.png" }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the script's directory.

use anyhow::Context;
use brandkit_brand::BrandProfileStore;
use brandkit_core::event_bus::Severity;
use brandkit_core::{AppConfig, BrandProfileUpdate, EventSink, Notification, UserId};
use brandkit_customizer::{Customizer, ScalarField};
use brandkit_storage::{
    ImageUpload, MemoryBrandProfileRepository, MemoryCustomizedTemplateRepository,
    MemoryObjectStore, StaticTemplateCatalog, TemplateCatalog,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub user_id: String,
    pub template_id: String,
    #[serde(default)]
    pub brand: Option<BrandProfileUpdate>,
    #[serde(default)]
    pub logo: Option<PathBuf>,
    #[serde(default)]
    pub edits: Vec<Edit>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    SetField { field: String, value: String },
    SetText { index: u32, value: String },
    SetImage { index: u32, url: String },
    UploadImage { index: u32, path: PathBuf },
    AttachDraft { index: u32, path: PathBuf },
}

impl Script {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid session script")
    }
}

/// What `customize` prints.
#[derive(Debug, Serialize)]
pub struct Report {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub customization: serde_json::Value,
    pub dropped: Vec<String>,
    pub drafts_uploaded: usize,
}

/// Forwards notifications to the log.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, n: Notification) {
        match n.severity() {
            Severity::Info => info!(kind = ?n.kind, user_id = ?n.user_id, subject = ?n.subject, "{}", n.message),
            Severity::Warning => warn!(kind = ?n.kind, user_id = ?n.user_id, subject = ?n.subject, "{}", n.message),
            Severity::Error => error!(kind = ?n.kind, user_id = ?n.user_id, subject = ?n.subject, "{}", n.message),
        }
    }
}

/// The in-memory stack a script runs against.
pub struct Backends {
    pub brands: BrandProfileStore,
    pub customizer: Customizer,
    pub catalog: StaticTemplateCatalog,
    pub templates: Arc<MemoryCustomizedTemplateRepository>,
}

impl Backends {
    pub fn in_memory(config: &AppConfig, sink: Arc<dyn EventSink>) -> anyhow::Result<Self> {
        let objects = Arc::new(MemoryObjectStore::new(config.upload.clone())?);
        let templates = Arc::new(MemoryCustomizedTemplateRepository::new());
        let brands = BrandProfileStore::new(
            Arc::new(MemoryBrandProfileRepository::new()),
            objects.clone(),
            sink.clone(),
        );
        let customizer = Customizer::new(
            templates.clone(),
            objects,
            sink,
            config.customizer.clone(),
        );
        Ok(Self {
            brands,
            customizer,
            catalog: StaticTemplateCatalog::builtin()?,
            templates,
        })
    }
}

async fn read_upload(base_dir: &Path, path: &Path) -> anyhow::Result<ImageUpload> {
    let full = base_dir.join(path);
    let bytes = tokio::fs::read(&full)
        .await
        .with_context(|| format!("reading {}", full.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ImageUpload::new(file_name, bytes))
}

/// Run `script` to completion: brand update, edits, draft upload, commit.
pub async fn replay(script: &Script, base_dir: &Path, backends: &Backends) -> anyhow::Result<Report> {
    let user = UserId::parse(&script.user_id)?;
    let template = backends
        .catalog
        .get(&script.template_id)
        .with_context(|| format!("unknown template '{}'", script.template_id))?;

    backends.brands.load(Some(&user)).await?;
    if let Some(update) = script.brand.as_ref().filter(|u| !u.is_empty()) {
        backends.brands.save(Some(&user), update.clone()).await?;
    }
    if let Some(logo) = &script.logo {
        let upload = read_upload(base_dir, logo).await?;
        backends.brands.set_logo(Some(&user), upload).await?;
    }

    let profile = backends.brands.current(&user);
    let mut session = backends.customizer.start(Some(&user), template, &profile)?;

    for edit in &script.edits {
        match edit {
            Edit::SetField { field, value } => {
                let field: ScalarField = field.parse()?;
                let value = field.validate_input(value)?;
                session.set_field(field, value)?;
            }
            Edit::SetText { index, value } => session.set_text(*index, value.clone())?,
            Edit::SetImage { index, url } => session.set_image(*index, url.clone())?,
            Edit::UploadImage { index, path } => {
                let upload = read_upload(base_dir, path).await?;
                session.upload_image(*index, upload).await?;
            }
            Edit::AttachDraft { index, path } => {
                let upload = read_upload(base_dir, path).await?;
                session.attach_draft_image(*index, upload)?;
            }
        }
    }

    let drafts_uploaded = session.resolve_drafts().await?;
    let outcome = session.commit().await?;

    Ok(Report {
        id: outcome.id.to_string(),
        name: outcome.name,
        template_id: session.template().id.clone(),
        customization: outcome.data.to_json()?,
        dropped: outcome.dropped.iter().map(ToString::to_string).collect(),
        drafts_uploaded,
    })
}
