use biblib_model::ModelError;
use thiserror::Error;

/// Error taxonomy for library operations.
///
/// The transport layer maps each variant to a fixed status and body so
/// clients can match on them.
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("no user identity supplied")]
    MissingIdentity,

    #[error("permission denied")]
    PermissionDenied,

    #[error("library not found: {0}")]
    LibraryNotFound(String),

    #[error("invalid library id: {0}")]
    InvalidLibraryId(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ModelError> for LibraryError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidSlug(slug) => LibraryError::InvalidLibraryId(slug),
            other => LibraryError::InvalidRequest(other.to_string()),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for LibraryError {
    fn from(err: sqlx::Error) -> Self {
        LibraryError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Internal(format!("Serialization error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
