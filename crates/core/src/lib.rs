//! Shared vocabulary for the brand customization workspace: brand profiles,
//! template content schemas, the error taxonomy, configuration and the
//! notification bus every store reports through.

pub mod attempt;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod types;

pub use attempt::{Attempt, AttemptTracker};
pub use config::{AppConfig, StalePolicy};
pub use error::{BrandkitError, BrandkitResult};
pub use event_bus::{EventSink, Notification, NotificationKind};
pub use types::{
    BrandProfile, BrandProfileUpdate, ContentElement, ElementKind, FontFamily, HexColor,
    ProfileId, TemplateContentSchema, TemplateDescriptor, UserId,
};
