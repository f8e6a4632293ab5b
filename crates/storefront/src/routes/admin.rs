//! Administration area landing.
//!
//! The marketplace's admin tools live elsewhere; this page is where admins
//! land after login and links out to them.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::menu::Layout;
use crate::middleware::RequireAdmin;

/// Admin landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub layout: Layout,
    pub name: String,
}

/// Display the admin landing page.
pub async fn index(RequireAdmin(session): RequireAdmin, layout: Layout) -> impl IntoResponse {
    AdminIndexTemplate {
        layout,
        name: session.user().display_name().to_string(),
    }
}
