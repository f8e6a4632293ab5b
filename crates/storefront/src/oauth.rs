//! Google `OpenID` Connect client for federated login.
//!
//! # OAuth Flow
//!
//! 1. Generate `state` and `nonce`, store both in the session
//! 2. Redirect to [`GoogleClient::authorization_url`]
//! 3. Google redirects back with an authorization code
//! 4. Exchange the code with [`GoogleClient::exchange_code`]
//! 5. Check the id token's nonce, then hand the id token to the marketplace
//!
//! The marketplace verifies the id token signature itself; the storefront
//! only checks that the token was minted for the login it started.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::GoogleConfig;

/// Length of generated `state` and `nonce` values.
pub const RANDOM_TOKEN_LEN: usize = 32;

/// Errors from the Google OAuth flow.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token exchange failed ({status}): {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Token response carried no id_token")]
    MissingIdToken,

    #[error("Malformed id_token")]
    MalformedIdToken,

    #[error("id_token nonce does not match the login attempt")]
    NonceMismatch,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    nonce: Option<String>,
}

/// Client for Google's authorization and token endpoints.
#[derive(Clone)]
pub struct GoogleClient {
    inner: Arc<GoogleClientInner>,
}

struct GoogleClientInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    authorize_url: String,
    token_url: String,
}

impl GoogleClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GoogleConfig, timeout: Duration) -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(GoogleClientInner {
                client,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                authorize_url: config.authorize_url.clone(),
                token_url: config.token_url.clone(),
            }),
        })
    }

    /// Build the URL that starts the login at Google.
    ///
    /// # Arguments
    ///
    /// * `redirect_uri` - The callback URL Google redirects back to
    /// * `state` - Random value stored in the session to prevent CSRF
    /// * `nonce` - Random value echoed back inside the id token
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str, nonce: &str) -> String {
        format!(
            "{}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20email%20profile&\
            state={}&\
            nonce={}&\
            prompt=select_account",
            self.inner.authorize_url,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
            urlencoding::encode(nonce)
        )
    }

    /// Exchange an authorization code for Google's id token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint rejects the code or the
    /// response carries no id token.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let tokens: TokenResponse = response.json().await?;
        tokens.id_token.ok_or(OAuthError::MissingIdToken)
    }
}

/// Check that an id token carries the nonce this login started with.
///
/// Only the payload is decoded; signature checks happen at the marketplace.
///
/// # Errors
///
/// Returns `MalformedIdToken` if the token is not a JWT with a JSON payload,
/// `NonceMismatch` if the nonce is absent or different.
pub fn verify_nonce(id_token: &str, expected: &str) -> Result<(), OAuthError> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => return Err(OAuthError::MalformedIdToken),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| OAuthError::MalformedIdToken)?;
    let claims: IdTokenClaims =
        serde_json::from_slice(&bytes).map_err(|_| OAuthError::MalformedIdToken)?;

    if claims.nonce.as_deref() == Some(expected) {
        Ok(())
    } else {
        Err(OAuthError::NonceMismatch)
    }
}

/// Generate a random alphanumeric token for `state` and `nonce`.
#[must_use]
pub fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jwt(claims: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    fn client() -> GoogleClient {
        let config = GoogleConfig {
            client_id: "ocop-web.apps.googleusercontent.com".to_string(),
            client_secret: SecretString::from("irrelevant"),
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        };
        GoogleClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_authorization_url_encodes_parameters() {
        let url = client().authorization_url("https://ocop.vn/auth/google/callback", "st", "nn");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Focop.vn%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("state=st&"));
        assert!(url.contains("nonce=nn&"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn test_nonce_accepted() {
        let token = jwt(r#"{"sub":"1","nonce":"abc"}"#);
        assert!(verify_nonce(&token, "abc").is_ok());
    }

    #[test]
    fn test_nonce_rejected() {
        let token = jwt(r#"{"sub":"1","nonce":"abc"}"#);
        assert!(matches!(
            verify_nonce(&token, "xyz"),
            Err(OAuthError::NonceMismatch)
        ));

        let token = jwt(r#"{"sub":"1"}"#);
        assert!(matches!(
            verify_nonce(&token, "abc"),
            Err(OAuthError::NonceMismatch)
        ));
    }

    #[test]
    fn test_malformed_token() {
        assert!(matches!(
            verify_nonce("not-a-jwt", "abc"),
            Err(OAuthError::MalformedIdToken)
        ));
        assert!(matches!(
            verify_nonce("a.!!!.c", "abc"),
            Err(OAuthError::MalformedIdToken)
        ));
    }

    #[test]
    fn test_random_tokens_differ() {
        let a = random_token();
        assert_eq!(a.len(), RANDOM_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, random_token());
    }
}
