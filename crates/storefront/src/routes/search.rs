//! Search route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::filters;
use crate::marketplace::{Product, ProductPage};
use crate::menu::Layout;
use crate::state::AppState;

/// Results per search page.
const PAGE_SIZE: u32 = 20;
/// Entries in the suggestion dropdown.
const SUGGEST_LIMIT: u32 = 5;
/// Shorter queries get no suggestions.
const MIN_SUGGEST_CHARS: usize = 2;

/// Search suggestions query parameters.
#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

/// Full search page query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchPageQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub page: Option<u32>,
}

/// Search suggestions template (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "partials/search_results.html")]
pub struct SearchResultsTemplate {
    pub query: String,
    pub products: Vec<Product>,
}

impl SearchResultsTemplate {
    /// Link to the full results page for a query.
    #[must_use]
    pub fn search_href(&self, query: &str) -> String {
        format!("/search?q={}", urlencoding::encode(query))
    }
}

/// Full search page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/search.html")]
pub struct SearchPageTemplate {
    pub layout: Layout,
    pub query: String,
    pub results: ProductPage,
    pub unavailable: bool,
}

impl SearchPageTemplate {
    /// Link to another page of the same search.
    #[must_use]
    pub fn page_href(&self, page: u32) -> String {
        format!("/search?q={}&page={page}", urlencoding::encode(&self.query))
    }
}

/// Search suggestions endpoint (HTMX).
#[instrument(skip(state))]
pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> impl IntoResponse {
    let query_str = query.q.trim();

    let products = if query_str.chars().count() < MIN_SUGGEST_CHARS {
        Vec::new()
    } else {
        state
            .marketplace()
            .search_products(query_str, 1, SUGGEST_LIMIT)
            .await
            .inspect_err(|e| tracing::warn!("Search suggestions failed: {}", e))
            .map(|page| page.products)
            .unwrap_or_default()
    };

    SearchResultsTemplate {
        query: query_str.to_string(),
        products,
    }
}

/// Full search page.
#[instrument(skip(state, layout))]
pub async fn search_page(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<SearchPageQuery>,
) -> impl IntoResponse {
    let query_str = query.q.trim().to_string();
    let page = query.page.unwrap_or(1).max(1);

    let (results, unavailable) = if query_str.is_empty() {
        (ProductPage::empty(PAGE_SIZE), false)
    } else {
        match state
            .marketplace()
            .search_products(&query_str, page, PAGE_SIZE)
            .await
        {
            Ok(results) => (results, false),
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                (ProductPage::empty(PAGE_SIZE), true)
            }
        }
    };

    SearchPageTemplate {
        layout: layout.with_search(&query_str),
        query: query_str,
        results,
        unavailable,
    }
}
