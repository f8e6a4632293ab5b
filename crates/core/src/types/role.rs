//! Marketplace roles.
//!
//! A user holds a *set* of roles. Access checks in [`crate::access`] are the
//! only place these sets are interpreted.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A capability tier granted by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Marketplace administrator.
    Admin,
    /// Base role of every registered account; may open a store.
    User,
    /// Legacy tier kept under its historical name; a regular, seller-eligible
    /// account for every purpose except display.
    Doctor,
}

impl Role {
    /// Rank used when a single role has to be shown. Higher wins.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Admin => 2,
            Self::Doctor => 1,
            Self::User => 0,
        }
    }

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Doctor => "doctor",
        }
    }

    /// Human-readable label for page chrome.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::User => "Member",
            Self::Doctor => "Doctor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "doctor" => Ok(Self::Doctor),
            other => Err(format!("invalid role: {other}")),
        }
    }
}

/// The roles assigned to one user.
///
/// Deserialization is lenient because the session may be built from a
/// partially loaded profile: `null` or a missing field yields an empty set,
/// a bare string is accepted as a single role, and unknown role names are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// An empty role set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Whether the role is held.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Whether no role is held at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add a role; returns `false` if it was already held.
    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    /// Iterate over the held roles in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl Serialize for RoleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoles {
    One(String),
    Many(Vec<Option<String>>),
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = match Option::<RawRoles>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(RawRoles::One(name)) => vec![name],
            Some(RawRoles::Many(names)) => names.into_iter().flatten().collect(),
        };

        Ok(names.iter().filter_map(|name| name.parse().ok()).collect())
    }
}
