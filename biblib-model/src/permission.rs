use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::ids::{LibraryId, UserId};

/// Independent permission flags held by one user on one library.
///
/// The flags do not imply one another: `write` does not set `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleFlags {
    pub read: bool,
    pub write: bool,
    pub admin: bool,
    pub owner: bool,
}

impl RoleFlags {
    pub fn owner() -> Self {
        Self {
            owner: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.read || self.write || self.admin || self.owner)
    }

    pub fn get(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Read => self.read,
            PermissionKind::Write => self.write,
            PermissionKind::Admin => self.admin,
            PermissionKind::Owner => self.owner,
        }
    }

    pub fn set(&mut self, kind: PermissionKind, value: bool) {
        match kind {
            PermissionKind::Read => self.read = value,
            PermissionKind::Write => self.write = value,
            PermissionKind::Admin => self.admin = value,
            PermissionKind::Owner => self.owner = value,
        }
    }

    /// Names of the flags that are set, in role-hierarchy order.
    pub fn granted(&self) -> Vec<&'static str> {
        PermissionKind::ALL
            .iter()
            .filter(|kind| self.get(**kind))
            .map(|kind| kind.as_str())
            .collect()
    }
}

/// A single flag name, as used by permission update requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PermissionKind {
    Owner,
    Admin,
    Write,
    Read,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 4] = [
        PermissionKind::Owner,
        PermissionKind::Admin,
        PermissionKind::Write,
        PermissionKind::Read,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Owner => "owner",
            PermissionKind::Admin => "admin",
            PermissionKind::Write => "write",
            PermissionKind::Read => "read",
        }
    }
}

impl FromStr for PermissionKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(PermissionKind::Owner),
            "admin" => Ok(PermissionKind::Admin),
            "write" => Ok(PermissionKind::Write),
            "read" => Ok(PermissionKind::Read),
            other => Err(ModelError::UnknownPermission(other.to_string())),
        }
    }
}

/// The stored grant for one (user, library) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permission {
    pub user_id: UserId,
    pub library_id: LibraryId,
    pub flags: RoleFlags,
}

/// Effective access level, resolved from [`RoleFlags`] by fixed priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    Owner,
    Admin,
    Write,
    Read,
    None,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Write => "write",
            Role::Read => "read",
            Role::None => "none",
        }
    }

    pub fn can_read(&self) -> bool {
        !matches!(self, Role::None)
    }

    pub fn can_mutate_documents(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Write)
    }

    pub fn can_manage_permissions(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_implies_read() {
        for role in [Role::Owner, Role::Admin, Role::Write, Role::Read, Role::None]
        {
            if role.can_mutate_documents() {
                assert!(role.can_read(), "{role} can mutate but not read");
            }
        }
    }

    #[test]
    fn flags_round_trip_by_kind() {
        let mut flags = RoleFlags::default();
        flags.set(PermissionKind::Write, true);
        flags.set(PermissionKind::Read, true);

        assert!(flags.get(PermissionKind::Write));
        assert!(!flags.get(PermissionKind::Admin));
        assert_eq!(flags.granted(), vec!["write", "read"]);

        flags.set(PermissionKind::Write, false);
        flags.set(PermissionKind::Read, false);
        assert!(flags.is_empty());
    }

    #[test]
    fn permission_kind_parses_case_insensitively() {
        assert_eq!("Admin".parse::<PermissionKind>(), Ok(PermissionKind::Admin));
        assert!("superuser".parse::<PermissionKind>().is_err());
    }
}
