//! Google sign-in route handlers.
//!
//! - Login: stores `state` and `nonce` in the session and redirects to Google
//! - Callback: validates them, exchanges the code, and signs in through the
//!   marketplace with the resulting id token

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::auth::complete_login;
use crate::models::session_keys;
use crate::oauth::{random_token, verify_nonce};
use crate::state::AppState;

/// Query parameters from the Google callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

fn redirect_uri(state: &AppState) -> String {
    format!("{}/auth/google/callback", state.config().base_url)
}

fn fail(code: &str) -> Response {
    Redirect::to(&format!("/auth/login?error={code}")).into_response()
}

/// Initiate Google login.
///
/// # Route
///
/// `GET /auth/google/login`
pub async fn login(State(state): State<AppState>, session: Session) -> Response {
    let Some(google) = state.google() else {
        return fail("google_disabled");
    };

    let oauth_state = random_token();
    let nonce = random_token();

    if let Err(e) = session
        .insert(session_keys::GOOGLE_OAUTH_STATE, &oauth_state)
        .await
    {
        tracing::error!("Failed to store OAuth state in session: {}", e);
        return fail("session");
    }
    if let Err(e) = session
        .insert(session_keys::GOOGLE_OAUTH_NONCE, &nonce)
        .await
    {
        tracing::error!("Failed to store OAuth nonce in session: {}", e);
        return fail("session");
    }

    let auth_url = google.authorization_url(&redirect_uri(&state), &oauth_state, &nonce);
    Redirect::to(&auth_url).into_response()
}

/// Handle the Google callback.
///
/// # Route
///
/// `GET /auth/google/callback`
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(google) = state.google() else {
        return fail("google_disabled");
    };

    if let Some(error) = query.error {
        tracing::warn!("Google OAuth error: {}", error);
        return fail("google_denied");
    }
    let Some(code) = query.code else {
        tracing::warn!("Google OAuth callback missing code");
        return fail("missing_code");
    };

    // State and nonce are single use, whatever happens next.
    let stored_state = session
        .remove::<String>(session_keys::GOOGLE_OAUTH_STATE)
        .await
        .ok()
        .flatten();
    let stored_nonce = session
        .remove::<String>(session_keys::GOOGLE_OAUTH_NONCE)
        .await
        .ok()
        .flatten();

    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("Google OAuth state mismatch");
        return fail("invalid_state");
    }

    let id_token = match google.exchange_code(&code, &redirect_uri(&state)).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!("Failed to exchange Google OAuth code: {}", e);
            return fail("google_rejected");
        }
    };

    let nonce_ok = stored_nonce
        .as_deref()
        .is_some_and(|nonce| verify_nonce(&id_token, nonce).is_ok());
    if !nonce_ok {
        tracing::warn!("Google id_token nonce mismatch");
        return fail("nonce");
    }

    match state.marketplace().login_with_google(&id_token).await {
        Ok(auth) => complete_login(&session, auth.token, auth.user).await,
        Err(e) if e.is_rejection() => {
            tracing::warn!("Marketplace rejected Google login: {}", e);
            fail("google_rejected")
        }
        Err(e) => {
            tracing::error!("Google login failed: {}", e);
            fail("unavailable")
        }
    }
}
