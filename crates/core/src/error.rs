use thiserror::Error;

pub type BrandkitResult<T> = Result<T, BrandkitError>;

#[derive(Error, Debug)]
pub enum BrandkitError {
    /// No user identity was supplied; mutating operations must be blocked.
    #[error("Not authenticated: no user identity supplied")]
    NotAuthenticated,

    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend unreachable or failed. Local state is untouched and the call may be retried.
    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    /// The upload capability rejected the asset. User-correctable, never retried.
    #[error("Upload rejected: {0}")]
    Upload(String),

    #[error("Stale element references (texts: {texts:?}, images: {images:?})")]
    StaleReference { texts: Vec<u32>, images: Vec<u32> },

    #[error("Editing session is closed ({0})")]
    SessionClosed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BrandkitError {
    /// Only backend failures are worth retrying; everything else needs a different input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrandkitError::TransientIo(_))
    }

    /// Short machine-readable code used in notifications and logs.
    pub fn code(&self) -> &'static str {
        match self {
            BrandkitError::NotAuthenticated => "not_authenticated",
            BrandkitError::Validation(_) => "validation",
            BrandkitError::TransientIo(_) => "transient_io",
            BrandkitError::Upload(_) => "upload",
            BrandkitError::StaleReference { .. } => "stale_reference",
            BrandkitError::SessionClosed(_) => "session_closed",
            BrandkitError::Config(_) => "config",
            BrandkitError::Serialization(_) => "serialization",
        }
    }
}

impl From<config::ConfigError> for BrandkitError {
    fn from(err: config::ConfigError) -> Self {
        BrandkitError::Config(err.to_string())
    }
}
