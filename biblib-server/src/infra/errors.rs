use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use biblib_core::LibraryError;
use serde_json::json;
use std::fmt;
use tracing::error;

pub const MISSING_IDENTITY_MESSAGE: &str =
    "You did not supply enough user information. Please make sure you are logged in.";
pub const PERMISSION_DENIED_MESSAGE: &str =
    "You do not have the correct permissions or this library does not exist.";
pub const LIBRARY_GONE_MESSAGE: &str = "Library specified does not exist.";
pub const INVALID_LIBRARY_ID_MESSAGE: &str = "Library ID specified is not valid.";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::MissingIdentity => {
                Self::bad_request(MISSING_IDENTITY_MESSAGE)
            }
            LibraryError::PermissionDenied => {
                Self::forbidden(PERMISSION_DENIED_MESSAGE)
            }
            LibraryError::LibraryNotFound(_) => Self::gone(LIBRARY_GONE_MESSAGE),
            LibraryError::InvalidLibraryId(_) => {
                Self::bad_request(INVALID_LIBRARY_ID_MESSAGE)
            }
            LibraryError::InvalidRequest(message) => Self::bad_request(message),
            err @ (LibraryError::UpstreamUnavailable(_)
            | LibraryError::Storage(_)
            | LibraryError::Internal(_)) => {
                // Details stay in the log.
                error!(error = %err, "request failed");
                Self::internal(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}
