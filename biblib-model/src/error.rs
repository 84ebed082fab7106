use std::fmt::{self, Display};

/// Errors produced by model constructors and parsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidSlug(String),
    InvalidUserId(String),
    UnknownPermission(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidSlug(slug) => {
                write!(f, "invalid library id: {slug}")
            }
            ModelError::InvalidUserId(raw) => write!(f, "invalid user id: {raw}"),
            ModelError::UnknownPermission(name) => {
                write!(f, "unknown permission: {name}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
