//! Authenticated marketplace user.

use serde::{Deserialize, Deserializer, Serialize};

use super::id::{StoreId, UserId};
use super::role::RoleSet;

/// An authenticated principal as returned by the marketplace API.
///
/// This is an immutable snapshot: the storefront replaces it wholesale on
/// login or profile refresh and never edits fields in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: RoleSet,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    /// Set once the user has completed store onboarding.
    #[serde(default, deserialize_with = "blank_id_as_none")]
    pub store_id: Option<StoreId>,
}

impl User {
    /// Name to show in page chrome: display name, then username, then email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        [&self.name, &self.username, &self.email]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    /// The owned store, if any and non-blank.
    #[must_use]
    pub fn store(&self) -> Option<&StoreId> {
        self.store_id.as_ref().filter(|id| !id.is_blank())
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn blank_id_as_none<'de, D>(deserializer: D) -> Result<Option<StoreId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(blank_as_none(deserializer)?.map(StoreId::from))
}
