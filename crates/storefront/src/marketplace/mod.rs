//! OCOP Market REST API client.
//!
//! # Architecture
//!
//! - The marketplace is the source of truth: no local sync, direct API calls
//! - In-memory caching via `moka`: product pages for 60 seconds, address
//!   directory lists for one hour (successful responses only)
//! - Authenticated calls carry the session's bearer token
//!
//! # Example
//!
//! ```rust,ignore
//! use ocop_storefront::marketplace::MarketplaceClient;
//!
//! let client = MarketplaceClient::new(&config.marketplace)?;
//!
//! let auth = client.login("lan@ocop.vn", "hunter22").await?;
//! let page = client.search_products("tra", 1, 20).await?;
//! ```

mod cache;
pub mod types;

pub use types::*;

use std::sync::Arc;

use moka::future::Cache;
use ocop_core::{District, DistrictId, Province, ProvinceId, User, Ward};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::MarketplaceConfig;
use cache::{CacheKey, CacheValue, KeyTtl};

/// Errors that can occur when calling the marketplace API.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Transport-level failure (connection refused, TLS, etc.).
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The bearer token was missing, invalid, or expired.
    #[error("Unauthorized")]
    Unauthorized,

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for MarketplaceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl MarketplaceError {
    /// The API's status code, when it answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Whether the API rejected the request itself (4xx), as opposed to
    /// being unreachable or failing internally.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }
}

/// Client for the marketplace REST API.
#[derive(Clone)]
pub struct MarketplaceClient {
    inner: Arc<MarketplaceClientInner>,
}

struct MarketplaceClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl MarketplaceClient {
    /// Create a new marketplace API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &MarketplaceConfig) -> Result<Self, MarketplaceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ocop-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(2_000)
            .expire_after(KeyTtl)
            .build();

        // Relative joins only keep the base path when it ends with a slash.
        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(MarketplaceClientInner {
                client,
                base_url,
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, MarketplaceError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request and decode a JSON body.
    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, MarketplaceError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(MarketplaceError::Unauthorized);
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<MessageResponse>(&body)
                .ok()
                .map(|m| m.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(MarketplaceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────

    /// Exchange email and password for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for bad credentials, or any transport error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, MarketplaceError> {
        let url = self.endpoint("auth/login")?;
        Self::send(
            self.inner
                .client
                .post(url)
                .json(&LoginRequest { email, password }),
        )
        .await
    }

    /// Create an account. Returns the API's acknowledgement message.
    ///
    /// # Errors
    ///
    /// Returns `Status` with the API's message when the account is rejected.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<String, MarketplaceError> {
        let url = self.endpoint("auth/register")?;
        let ack: MessageResponse = Self::send(self.inner.client.post(url).json(request)).await?;
        Ok(ack.message)
    }

    /// Exchange a Google ID token for a marketplace bearer token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the marketplace rejects the ID token.
    #[instrument(skip_all)]
    pub async fn login_with_google(&self, id_token: &str) -> Result<AuthResponse, MarketplaceError> {
        let url = self.endpoint("auth/google")?;
        Self::send(
            self.inner
                .client
                .post(url)
                .json(&GoogleLoginRequest { id_token }),
        )
        .await
    }

    /// Fetch the profile behind a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the token has expired.
    #[instrument(skip_all)]
    pub async fn current_user(&self, token: &SecretString) -> Result<User, MarketplaceError> {
        let url = self.endpoint("auth/me")?;
        Self::send(
            self.inner
                .client
                .get(url)
                .bearer_auth(token.expose_secret()),
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Products
    // ─────────────────────────────────────────────────────────────────────────

    /// Full-text product search.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        query: &str,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, MarketplaceError> {
        let page = page.max(1);
        let key = CacheKey::Search {
            query: query.trim().to_lowercase(),
            page,
            limit,
        };

        if let Some(CacheValue::Products(cached)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product search");
            return Ok(cached);
        }

        let mut url = self.endpoint("products/search")?;
        url.query_pairs_mut()
            .append_pair("q", query.trim())
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());

        let result: ProductPage = Self::send(self.inner.client.get(url)).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Products(result.clone()))
            .await;
        Ok(result)
    }

    /// Products for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: u32) -> Result<ProductPage, MarketplaceError> {
        let key = CacheKey::Featured { limit };
        if let Some(CacheValue::Products(cached)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for featured products");
            return Ok(cached);
        }

        let mut url = self.endpoint("products")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let result: ProductPage = Self::send(self.inner.client.get(url)).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Products(result.clone()))
            .await;
        Ok(result)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Address directory
    // ─────────────────────────────────────────────────────────────────────────

    /// All provinces.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self))]
    pub async fn list_provinces(&self) -> Result<Vec<Province>, MarketplaceError> {
        let key = CacheKey::Provinces;
        if let Some(CacheValue::Provinces(cached)) = self.inner.cache.get(&key).await {
            return Ok(cached);
        }

        let url = self.endpoint("address/provinces")?;
        let list: ListResponse<Province> = Self::send(self.inner.client.get(url)).await?;
        let list = list.into_vec();
        self.inner
            .cache
            .insert(key, CacheValue::Provinces(list.clone()))
            .await;
        Ok(list)
    }

    /// Districts of one province.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self))]
    pub async fn list_districts(&self, province: &ProvinceId) -> Result<Vec<District>, MarketplaceError> {
        let key = CacheKey::Districts(province.clone());
        if let Some(CacheValue::Districts(cached)) = self.inner.cache.get(&key).await {
            return Ok(cached);
        }

        let mut url = self.endpoint("address/districts")?;
        url.query_pairs_mut()
            .append_pair("provinceId", province.as_str());

        let list: ListResponse<District> = Self::send(self.inner.client.get(url)).await?;
        let list = list.into_vec();
        self.inner
            .cache
            .insert(key, CacheValue::Districts(list.clone()))
            .await;
        Ok(list)
    }

    /// Wards of one district.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self))]
    pub async fn list_wards(&self, district: &DistrictId) -> Result<Vec<Ward>, MarketplaceError> {
        let key = CacheKey::Wards(district.clone());
        if let Some(CacheValue::Wards(cached)) = self.inner.cache.get(&key).await {
            return Ok(cached);
        }

        let mut url = self.endpoint("address/wards")?;
        url.query_pairs_mut()
            .append_pair("districtId", district.as_str());

        let list: ListResponse<Ward> = Self::send(self.inner.client.get(url)).await?;
        let list = list.into_vec();
        self.inner
            .cache
            .insert(key, CacheValue::Wards(list.clone()))
            .await;
        Ok(list)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stores (not cached - mutable state)
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a store owned by the token's user.
    ///
    /// # Errors
    ///
    /// Returns `Status` with the API's message when the store is rejected.
    #[instrument(skip_all, fields(store = %request.name))]
    pub async fn create_store(
        &self,
        token: &SecretString,
        request: &CreateStoreRequest,
    ) -> Result<Store, MarketplaceError> {
        let url = self.endpoint("stores")?;
        Self::send(
            self.inner
                .client
                .post(url)
                .bearer_auth(token.expose_secret())
                .json(request),
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Health
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether the API answers HTTP at all. Any status counts as reachable.
    pub async fn is_reachable(&self) -> bool {
        self.inner
            .client
            .get(self.inner.base_url.clone())
            .send()
            .await
            .is_ok()
    }
}
