//! Template customization: the per-template override record seeded from a
//! brand profile, its commit-time validation, and the editing session that
//! owns a record until it is committed or discarded.

pub mod commit;
pub mod record;
pub mod session;
pub mod validation;

pub use commit::{commit, CommitContext, CommitOutcome};
pub use record::{CustomizationRecord, ImageRef, LogoPosition, ScalarField, FONT_SIZES};
pub use session::{Customizer, EditingSession, SessionState};
pub use validation::{validate_for_commit, CommitValidation, CustomizationData, StaleKey, StaleReason};
