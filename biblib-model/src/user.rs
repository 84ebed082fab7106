use crate::ids::{AbsoluteUid, UserId};

/// A user known to this service. The identity subsystem owns the absolute id;
/// the service-local id is assigned on first contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    pub id: UserId,
    pub absolute_uid: AbsoluteUid,
}
