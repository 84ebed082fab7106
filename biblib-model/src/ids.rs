use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uuid::Uuid;

use crate::error::ModelError;

/// Strongly typed ID for libraries.
///
/// Externally a library is addressed by its slug: the 16 UUID bytes encoded
/// as unpadded URL-safe base64 (22 characters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LibraryId(pub Uuid);

impl Default for LibraryId {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryId {
    pub fn new() -> Self {
        LibraryId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }

    /// Encode the id as the slug used in URLs and API payloads.
    pub fn to_slug(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0.as_bytes())
    }

    /// Decode a slug produced by [`LibraryId::to_slug`].
    pub fn from_slug(slug: &str) -> Result<Self, ModelError> {
        let trimmed = slug.trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .map_err(|_| ModelError::InvalidSlug(slug.to_string()))?;
        let uuid = Uuid::from_slice(&bytes)
            .map_err(|_| ModelError::InvalidSlug(slug.to_string()))?;
        Ok(LibraryId(uuid))
    }
}

impl AsRef<Uuid> for LibraryId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for LibraryId {
    fn from(value: Uuid) -> Self {
        LibraryId(value)
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service-local user id (primary key of the users table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute id assigned by the upstream identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AbsoluteUid(pub i64);

impl fmt::Display for AbsoluteUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AbsoluteUid {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(AbsoluteUid)
            .map_err(|_| ModelError::InvalidUserId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_22_url_safe_characters() {
        let id = LibraryId::new();
        let slug = id.to_slug();

        assert_eq!(slug.len(), 22);
        assert!(
            slug.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_eq!(LibraryId::from_slug(&slug).unwrap(), id);
    }

    #[test]
    fn slug_with_padding_is_accepted() {
        let id = LibraryId(Uuid::nil());
        let padded = format!("{}==", id.to_slug());

        assert_eq!(LibraryId::from_slug(&padded).unwrap(), id);
    }

    #[test]
    fn malformed_slugs_are_rejected() {
        assert!(matches!(
            LibraryId::from_slug("not a slug!"),
            Err(ModelError::InvalidSlug(_))
        ));
        // valid base64 but not 16 bytes
        assert!(LibraryId::from_slug("AAAA").is_err());
    }

    #[test]
    fn absolute_uid_parses_from_header_text() {
        assert_eq!(" 42 ".parse::<AbsoluteUid>().unwrap(), AbsoluteUid(42));
        assert!("abc".parse::<AbsoluteUid>().is_err());
    }
}
