use async_trait::async_trait;
use biblib_model::AbsoluteUid;

/// Label reported when the owner's email cannot be resolved.
pub const OWNER_UNAVAILABLE: &str = "Not available";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Identity service returned HTTP {0}")]
    Status(u16),

    #[error("Malformed identity response: {0}")]
    MalformedResponse(String),

    #[error("Invalid identity endpoint: {0}")]
    InvalidEndpoint(String),
}

impl IdentityError {
    /// The service answered and rejected the key, as opposed to being
    /// unreachable or failing.
    pub fn is_unknown_user(&self) -> bool {
        matches!(self, IdentityError::Status(code) if (400..500).contains(code))
    }
}

/// Maps between identity-subsystem user ids and email addresses.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn email_for(&self, uid: AbsoluteUid) -> Result<String, IdentityError>;

    async fn uid_for_email(&self, email: &str)
    -> Result<AbsoluteUid, IdentityError>;
}

/// Display label for a library owner: the local part of the email.
pub fn owner_label(lookup: Result<String, IdentityError>) -> String {
    match lookup {
        Ok(email) => email
            .split_once('@')
            .map(|(local, _)| local.to_string())
            .unwrap_or(email),
        Err(_) => OWNER_UNAVAILABLE.to_string(),
    }
}
