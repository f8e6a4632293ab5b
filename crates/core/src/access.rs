//! Role predicates.
//!
//! Every navigation and menu decision in the storefront goes through these
//! functions. They are total: a user with no roles at all is treated as
//! holding the base [`Role::User`] role.

use crate::types::{Role, User};

/// Where to send a user right after a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// The administration area.
    Admin,
    /// The default landing page.
    Home,
}

/// Whether the user may enter the administration area.
///
/// Only [`Role::Admin`] grants this.
#[must_use]
pub fn can_access_admin_page(user: &User) -> bool {
    user.roles.contains(Role::Admin)
}

/// Whether the user is an administrator.
///
/// Same rule as [`can_access_admin_page`]; used to hide seller-only items
/// rather than to gate routes.
#[must_use]
pub fn is_admin(user: &User) -> bool {
    user.roles.contains(Role::Admin)
}

/// Whether the user is a seller: holds the base role and owns a store.
///
/// [`Role::Doctor`] is a regular account under another name and counts as
/// the base role, as does an empty role set. Administration alone does not.
#[must_use]
pub fn is_seller(user: &User) -> bool {
    holds_base_role(user) && user.store().is_some()
}

/// The single role to display, by precedence `admin > doctor > user`.
#[must_use]
pub fn get_role(user: &User) -> Role {
    user.roles
        .iter()
        .max_by_key(|role| role.precedence())
        .unwrap_or(Role::User)
}

/// Post-login dispatch: admins go to the admin area, everyone else home.
#[must_use]
pub fn post_login_destination(user: &User) -> Landing {
    if can_access_admin_page(user) {
        Landing::Admin
    } else {
        Landing::Home
    }
}

fn holds_base_role(user: &User) -> bool {
    user.roles.is_empty()
        || user.roles.contains(Role::User)
        || user.roles.contains(Role::Doctor)
}
