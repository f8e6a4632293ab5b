//! Request and response bodies of the marketplace REST API.

use ocop_core::{Price, ProductId, StoreId, User};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(super) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GoogleLoginRequest<'a> {
    pub id_token: &'a str,
}

/// Account registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Successful login: bearer token plus the user profile.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Plain `{ "message": ... }` body used for acknowledgements and errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Products
// ─────────────────────────────────────────────────────────────────────────────

/// A product as listed in search results and on the home page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl Product {
    /// Rating on the 0 to 5 scale with one decimal, if the product has one.
    #[must_use]
    pub fn rating_text(&self) -> Option<String> {
        self.rating
            .filter(|r| !r.is_nan())
            .map(|r| format!("{:.1}", r.clamp(0.0, 5.0)))
    }
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

const fn first_page() -> u32 {
    1
}

impl ProductPage {
    /// An empty first page.
    #[must_use]
    pub const fn empty(limit: u32) -> Self {
        Self {
            products: Vec::new(),
            total: 0,
            page: 1,
            limit,
        }
    }

    /// Number of pages for the total hit count.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return u64::from(!self.products.is_empty());
        }
        self.total.div_ceil(u64::from(self.limit))
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stores
// ─────────────────────────────────────────────────────────────────────────────

/// Store creation payload: address ids plus their resolved display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    pub name: String,
    pub description: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub province: String,
    pub province_name: String,
    pub district: String,
    pub district_name: String,
    pub ward: String,
    pub ward_name: String,
}

/// A store as returned after creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    #[serde(default)]
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// Directory lists come back either bare or wrapped in `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ListResponse<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListResponse<T> {
    pub(super) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}
