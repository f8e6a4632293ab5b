//! Session-related types.
//!
//! The authenticated session is an immutable snapshot. It changes only
//! through [`AuthState::login`] and [`AuthState::logout`]; handlers never
//! edit the stored user in place.

use ocop_core::{Role, User};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Bearer token plus the user it belongs to.
#[derive(Clone)]
pub struct AuthSession {
    token: SecretString,
    user: User,
}

impl AuthSession {
    /// Marketplace bearer token for authenticated API calls.
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }

    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"[REDACTED]")
            .field("user", &self.user.id)
            .finish()
    }
}

/// Wire shape inside the session store.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
    user: User,
}

impl Serialize for AuthSession {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StoredSession {
            token: self.token.expose_secret().to_string(),
            user: self.user.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AuthSession {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = StoredSession::deserialize(deserializer)?;
        Ok(Self {
            token: SecretString::from(stored.token),
            user: stored.user,
        })
    }
}

/// Who is using the storefront right now.
#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated(AuthSession),
}

impl AuthState {
    /// The state after a successful login or profile refresh.
    #[must_use]
    pub const fn login(token: SecretString, user: User) -> Self {
        Self::Authenticated(AuthSession { token, user })
    }

    /// The state after logout.
    #[must_use]
    pub const fn logout() -> Self {
        Self::Anonymous
    }

    #[must_use]
    pub const fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(session) => Some(session),
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(session) => Some(&session.user),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Anonymous visitors are never admins.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(ocop_core::is_admin)
    }

    /// Anonymous visitors are never sellers.
    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.user().is_some_and(ocop_core::is_seller)
    }

    /// Effective role, if signed in.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user().map(ocop_core::get_role)
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the authenticated session snapshot.
    pub const AUTH: &str = "auth";

    /// Key for Google OAuth state (CSRF protection).
    pub const GOOGLE_OAUTH_STATE: &str = "google_oauth_state";

    /// Key for Google OAuth nonce (`OpenID` Connect replay protection).
    pub const GOOGLE_OAUTH_NONCE: &str = "google_oauth_nonce";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ocop_core::{RoleSet, StoreId, UserId};

    use super::*;

    fn user(roles: &[Role], store: Option<&str>) -> User {
        User {
            id: UserId::new("u-1"),
            username: "lan".to_string(),
            name: "Lan".to_string(),
            email: "lan@ocop.vn".to_string(),
            roles: roles.iter().copied().collect::<RoleSet>(),
            avatar: None,
            phone: None,
            store_id: store.map(StoreId::new),
        }
    }

    #[test]
    fn test_anonymous_has_no_privileges() {
        let state = AuthState::default();
        assert!(!state.is_authenticated());
        assert!(!state.is_admin());
        assert!(!state.is_seller());
        assert_eq!(state.role(), None);
    }

    #[test]
    fn test_login_then_logout() {
        let state = AuthState::login(SecretString::from("jwt"), user(&[Role::Admin], None));
        assert!(state.is_authenticated());
        assert!(state.is_admin());
        assert_eq!(state.role(), Some(Role::Admin));

        let state = AuthState::logout();
        assert!(state.user().is_none());
    }

    #[test]
    fn test_login_replaces_snapshot_wholesale() {
        let before = AuthState::login(SecretString::from("jwt"), user(&[Role::User], None));
        assert!(!before.is_seller());

        let token = before.session().unwrap().token().clone();
        let after = AuthState::login(token, user(&[Role::User], Some("s-1")));
        assert!(after.is_seller());
        assert!(!before.is_seller());
    }

    #[test]
    fn test_session_round_trips_through_store_and_redacts_debug() {
        let session = AuthSession {
            token: SecretString::from("very-secret-jwt"),
            user: user(&[Role::Doctor], Some("s-1")),
        };

        let json = serde_json::to_value(&session).unwrap();
        let restored: AuthSession = serde_json::from_value(json).unwrap();

        assert_eq!(restored.token().expose_secret(), "very-secret-jwt");
        assert_eq!(restored.user(), session.user());
        assert!(!format!("{session:?}").contains("very-secret-jwt"));
    }
}
