//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::marketplace::Product;
use crate::menu::Layout;
use crate::state::AppState;

/// Number of products shown on the home page.
const FEATURED_LIMIT: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub products: Vec<Product>,
    /// The product list failed to load.
    pub unavailable: bool,
}

/// Display the home page.
///
/// A marketplace outage degrades to an empty product grid with a notice
/// rather than an error page.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, layout: Layout) -> impl IntoResponse {
    let (products, unavailable) = match state.marketplace().featured_products(FEATURED_LIMIT).await
    {
        Ok(page) => (page.products, false),
        Err(e) => {
            tracing::warn!("Failed to load featured products: {}", e);
            (Vec::new(), true)
        }
    };

    HomeTemplate {
        layout,
        products,
        unavailable,
    }
}
