//! Page chrome: the header menu and the per-request [`Layout`].
//!
//! Which items appear is decided only by the role predicates in
//! `ocop_core::access`, read through the session snapshot.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::middleware::{CspNonce, OptionalAuth};
use crate::models::AuthState;
use crate::state::AppState;

/// How a menu entry is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuMethod {
    /// Plain link.
    Get,
    /// Button inside a small form (logout must not be a GET).
    Post,
}

/// One entry of the header menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub href: String,
    pub method: MenuMethod,
}

impl MenuItem {
    fn link(label: &'static str, href: impl Into<String>) -> Self {
        Self {
            label,
            href: href.into(),
            method: MenuMethod::Get,
        }
    }

    fn post(label: &'static str, href: impl Into<String>) -> Self {
        Self {
            label,
            href: href.into(),
            method: MenuMethod::Post,
        }
    }

    #[must_use]
    pub fn is_post(&self) -> bool {
        self.method == MenuMethod::Post
    }
}

/// Build the header menu for the current visitor.
///
/// Administrators see the dashboard and never seller items. Sellers get a
/// link to their store in the seller portal (or their account page when no
/// portal is configured); everyone else is offered store creation.
#[must_use]
pub fn header_menu(auth: &AuthState, seller_portal_url: Option<&str>) -> Vec<MenuItem> {
    let Some(user) = auth.user() else {
        return vec![
            MenuItem::link("Login", "/auth/login"),
            MenuItem::link("Register", "/auth/register"),
        ];
    };

    let mut items = vec![MenuItem::link("Account", "/account")];

    if ocop_core::is_admin(user) {
        items.push(MenuItem::link("Admin dashboard", "/admin"));
    } else if ocop_core::is_seller(user) {
        items.push(MenuItem::link(
            "My store",
            seller_portal_url.unwrap_or("/account"),
        ));
    } else {
        items.push(MenuItem::link("Open a store", "/store/create"));
    }

    items.push(MenuItem::post("Logout", "/auth/logout"));
    items
}

/// Everything the base template needs on every page.
#[derive(Debug, Clone)]
pub struct Layout {
    pub menu: Vec<MenuItem>,
    /// Display name of the signed-in user.
    pub user_name: Option<String>,
    /// Label of the effective role.
    pub role_label: Option<&'static str>,
    /// Current search box contents.
    pub search_query: String,
    pub nonce: String,
}

impl Layout {
    #[must_use]
    pub fn new(auth: &AuthState, seller_portal_url: Option<&str>, nonce: String) -> Self {
        Self {
            menu: header_menu(auth, seller_portal_url),
            user_name: auth.user().map(|user| user.display_name().to_string()),
            role_label: auth.role().map(ocop_core::Role::label),
            search_query: String::new(),
            nonce,
        }
    }

    /// Prefill the header search box.
    #[must_use]
    pub fn with_search(mut self, query: &str) -> Self {
        self.search_query = query.trim().to_string();
        self
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let OptionalAuth(auth) = OptionalAuth::from_request_parts(parts, state).await?;
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|nonce| nonce.value().to_string())
            .unwrap_or_default();

        Ok(Self::new(
            &auth,
            state.config().seller_portal_url.as_deref(),
            nonce,
        ))
    }
}
