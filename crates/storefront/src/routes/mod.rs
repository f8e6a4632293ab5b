//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (featured products)
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (marketplace reachable)
//!
//! # Search
//! GET  /search                 - Search results page
//! GET  /search/suggest         - Suggestions dropdown (HTMX fragment)
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action (rate limited)
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action (rate limited)
//! POST /auth/logout            - Logout action
//! GET  /auth/google/login      - Redirect to Google
//! GET  /auth/google/callback   - Handle Google callback
//!
//! # Account (requires auth)
//! GET  /account                - Profile overview
//!
//! # Admin (requires admin)
//! GET  /admin                  - Administration landing
//!
//! # Store onboarding (requires a signed-in non-seller)
//! GET  /store/create           - Store form
//! POST /store/create           - Submit store
//! POST /store/create/province  - Province picked (address fragment)
//! POST /store/create/district  - District picked (address fragment)
//! POST /store/create/ward      - Ward picked (204)
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod google_auth;
pub mod home;
pub mod search;
pub mod store;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
        // Google OpenID Connect
        .route("/google/login", get(google_auth::login))
        .route("/google/callback", get(google_auth::callback))
}

/// Create the store onboarding routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/create", get(store::new_store).post(store::create))
        .route("/create/province", post(store::select_province))
        .route("/create/district", post(store::select_district))
        .route("/create/ward", post(store::select_ward))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/search", get(search::search_page))
        .route("/search/suggest", get(search::suggest))
        .route("/account", get(account::index))
        .route("/admin", get(admin::index))
        .nest("/auth", auth_routes())
        .nest("/store", store_routes())
}

/// Human-readable text for the `error=` codes used in redirects.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Incorrect email or password.",
        "invalid_email" => "Please enter a valid email address.",
        "missing_fields" => "Please fill in every field.",
        "password_mismatch" => "Passwords do not match.",
        "password_too_short" => "Password must be at least 8 characters.",
        "email_taken" => "An account with this email or username already exists.",
        "session" | "session_expired" => "Your session has expired, please sign in again.",
        "unavailable" => "The marketplace is unavailable right now, please try again.",
        "google_disabled" => "Google sign-in is not available.",
        "google_denied" => "Google sign-in was cancelled.",
        "invalid_state" | "missing_code" | "nonce" => "Google sign-in failed, please try again.",
        "google_rejected" => "This Google account could not be signed in.",
        "already_seller" => "You already own a store.",
        _ => "Something went wrong, please try again.",
    }
}

/// Human-readable text for the `success=` codes used in redirects.
#[must_use]
pub fn success_message(code: &str) -> &'static str {
    match code {
        "registered" => "Account created. You can sign in now.",
        "store_created" => "Your store has been created.",
        _ => "Done.",
    }
}

/// Query parameters carrying a flash message code.
#[derive(Debug, Default, serde::Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    #[must_use]
    pub fn error_text(&self) -> Option<&'static str> {
        self.error.as_deref().map(error_message)
    }

    #[must_use]
    pub fn success_text(&self) -> Option<&'static str> {
        self.success.as_deref().map(success_message)
    }
}
