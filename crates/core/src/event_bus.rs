//! User-facing notification bus.
//!
//! Stores and editing sessions accept an `Arc<dyn EventSink>` and report every
//! successful save, upload and commit through it, as well as every boundary
//! failure. The UI layer turns these into toasts; navigation after a commit is
//! also driven from here.

use crate::error::BrandkitError;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BrandSaved,
    LogoUploaded,
    ImageAttached,
    TemplateSaved,
    StaleKeysDropped,
    OperationFailed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn severity(&self) -> Severity {
        match self {
            NotificationKind::OperationFailed => Severity::Error,
            NotificationKind::StaleKeysDropped => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub user_id: Option<String>,
    /// What the notification is about: a template id, an object key, ...
    pub subject: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, notification: Notification);
}

/// No-op sink for callers that don't surface notifications.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _notification: Notification) {}
}

/// Records every notification in emission order. Tests assert on it; the
/// CLI has no use for it.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<Notification>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().clone()
    }

    /// Kinds in the order they were emitted.
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.events.lock().iter().map(|n| n.kind).collect()
    }

    pub fn count_kind(&self, kind: NotificationKind) -> usize {
        self.events.lock().iter().filter(|n| n.kind == kind).count()
    }

    /// Notifications addressed to `user`.
    pub fn for_user(&self, user: &UserId) -> Vec<Notification> {
        self.events
            .lock()
            .iter()
            .filter(|n| n.user_id.as_deref() == Some(user.as_str()))
            .cloned()
            .collect()
    }

    /// Remove and return everything captured so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, notification: Notification) {
        self.events.lock().push(notification);
    }
}

pub fn make_notification(
    kind: NotificationKind,
    user_id: Option<&UserId>,
    subject: Option<String>,
    message: impl Into<String>,
) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        kind,
        user_id: user_id.map(|u| u.to_string()),
        subject,
        message: message.into(),
        timestamp: Utc::now(),
    }
}

/// Failure notification carrying the error's code as subject prefix.
pub fn failure_notification(
    user_id: Option<&UserId>,
    operation: &str,
    err: &BrandkitError,
) -> Notification {
    make_notification(
        NotificationKind::OperationFailed,
        user_id,
        Some(format!("{operation}:{}", err.code())),
        err.to_string(),
    )
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink_records_in_order() {
        let sink = capture_sink();
        let user = UserId::parse("user-1").unwrap();
        let other = UserId::parse("user-2").unwrap();
        assert!(sink.kinds().is_empty());

        sink.emit(make_notification(
            NotificationKind::BrandSaved,
            Some(&user),
            None,
            "Brand settings saved",
        ));
        sink.emit(failure_notification(
            Some(&user),
            "save",
            &BrandkitError::TransientIo("backend down".into()),
        ));
        sink.emit(make_notification(
            NotificationKind::TemplateSaved,
            Some(&other),
            None,
            "saved",
        ));

        assert_eq!(
            sink.kinds(),
            vec![
                NotificationKind::BrandSaved,
                NotificationKind::OperationFailed,
                NotificationKind::TemplateSaved,
            ]
        );
        assert_eq!(sink.count_kind(NotificationKind::OperationFailed), 1);

        let mine = sink.for_user(&user);
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[1].severity(), Severity::Error);
        assert_eq!(mine[1].subject.as_deref(), Some("save:transient_io"));

        assert_eq!(sink.take().len(), 3);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_noop_sink() {
        let sink = noop_sink();
        sink.emit(make_notification(
            NotificationKind::TemplateSaved,
            None,
            None,
            "saved",
        ));
    }

    #[test]
    fn test_severity_by_kind() {
        assert_eq!(NotificationKind::StaleKeysDropped.severity(), Severity::Warning);
        assert_eq!(NotificationKind::LogoUploaded.severity(), Severity::Info);
    }
}
