//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::Query, response::IntoResponse};

use super::MessageQuery;
use crate::filters;
use crate::menu::Layout;
use crate::middleware::RequireAuth;

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub layout: Layout,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub role_label: &'static str,
    pub is_admin: bool,
    pub is_seller: bool,
    pub store_id: Option<String>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Display account overview page.
pub async fn index(
    RequireAuth(session): RequireAuth,
    layout: Layout,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    let user = session.user();

    AccountIndexTemplate {
        layout,
        name: user.display_name().to_string(),
        username: user.username.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        avatar: user.avatar.clone(),
        role_label: ocop_core::get_role(user).label(),
        is_admin: ocop_core::is_admin(user),
        is_seller: ocop_core::is_seller(user),
        store_id: user.store().map(ToString::to_string),
        error: query.error_text(),
        success: query.success_text(),
    }
}
