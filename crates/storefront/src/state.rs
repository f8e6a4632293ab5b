//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::config::StorefrontConfig;
use crate::marketplace::{MarketplaceClient, MarketplaceError};
use crate::oauth::{GoogleClient, OAuthError};
use crate::services::address::AddressForms;

/// Error creating the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("marketplace client: {0}")]
    Marketplace(#[from] MarketplaceError),
    #[error("google client: {0}")]
    Google(#[from] OAuthError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the API clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    marketplace: MarketplaceClient,
    google: Option<GoogleClient>,
    address_forms: AddressForms,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let marketplace = MarketplaceClient::new(&config.marketplace)?;
        let google = config
            .google
            .as_ref()
            .map(|google| GoogleClient::new(google, config.marketplace.timeout))
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                marketplace,
                google,
                address_forms: AddressForms::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the marketplace API client.
    #[must_use]
    pub fn marketplace(&self) -> &MarketplaceClient {
        &self.inner.marketplace
    }

    /// Google login client, if federated login is configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleClient> {
        self.inner.google.as_ref()
    }

    /// Open store-creation address forms.
    #[must_use]
    pub fn address_forms(&self) -> &AddressForms {
        &self.inner.address_forms
    }
}
