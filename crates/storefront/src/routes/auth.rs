//! Authentication route handlers.
//!
//! Handles login, registration, and logout against the marketplace API.
//! Local and Google logins finish through the same [`complete_login`], so
//! both apply the same post-login dispatch.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use ocop_core::{Email, Landing, User};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::MessageQuery;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::marketplace::{MarketplaceError, RegisterRequest};
use crate::menu::Layout;
use crate::middleware::{sign_in, sign_out};
use crate::models::AuthState;
use crate::state::AppState;

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
    pub google_enabled: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
}

// =============================================================================
// Post-login dispatch
// =============================================================================

/// Path for a post-login landing.
#[must_use]
pub const fn landing_path(landing: Landing) -> &'static str {
    match landing {
        Landing::Admin => "/admin",
        Landing::Home => "/",
    }
}

/// Store the new session and redirect by role.
pub async fn complete_login(session: &Session, token: String, user: User) -> Response {
    let destination = landing_path(ocop_core::post_login_destination(&user));
    set_sentry_user(&user.id, Some(&user.email));
    tracing::info!(user_id = %user.id, role = %ocop_core::get_role(&user), "User signed in");

    let state = AuthState::login(SecretString::from(token), user);
    if let Err(e) = sign_in(session, &state).await {
        tracing::error!("Failed to store session: {}", e);
        return Redirect::to("/auth/login?error=session").into_response();
    }

    Redirect::to(destination).into_response()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        layout,
        error: query.error_text(),
        success: query.success_text(),
        google_enabled: state.google().is_some(),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/auth/login?error=invalid_email").into_response();
    };
    if form.password.is_empty() {
        return Redirect::to("/auth/login?error=missing_fields").into_response();
    }

    match state
        .marketplace()
        .login(email.as_str(), &form.password)
        .await
    {
        Ok(auth) => complete_login(&session, auth.token, auth.user).await,
        Err(e) if e.is_rejection() => {
            tracing::warn!("Login rejected: {}", e);
            Redirect::to("/auth/login?error=credentials").into_response()
        }
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            Redirect::to("/auth/login?error=unavailable").into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(layout: Layout, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate {
        layout,
        error: query.error_text(),
    }
}

/// Check a registration form, returning the error code on failure.
fn validate_registration(form: &RegisterForm) -> Result<RegisterRequest, &'static str> {
    if form.username.trim().is_empty() || form.name.trim().is_empty() {
        return Err("missing_fields");
    }
    let email = Email::parse(&form.email).map_err(|_| "invalid_email")?;
    if form.password != form.password_confirm {
        return Err("password_mismatch");
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err("password_too_short");
    }

    Ok(RegisterRequest {
        username: form.username.trim().to_string(),
        name: form.name.trim().to_string(),
        email: email.into_inner(),
        password: form.password.clone(),
    })
}

/// Handle registration form submission.
///
/// The marketplace does not sign the new account in; the user is sent to
/// the login page.
#[instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let request = match validate_registration(&form) {
        Ok(request) => request,
        Err(code) => return Redirect::to(&format!("/auth/register?error={code}")).into_response(),
    };

    match state.marketplace().register(&request).await {
        Ok(message) => {
            tracing::info!(username = %request.username, "Account registered: {}", message);
            Redirect::to("/auth/login?success=registered").into_response()
        }
        Err(MarketplaceError::Status { status: 409, .. }) => {
            Redirect::to("/auth/register?error=email_taken").into_response()
        }
        Err(e) if e.is_rejection() => {
            tracing::warn!("Registration rejected: {}", e);
            Redirect::to("/auth/register?error=failed").into_response()
        }
        Err(e) => {
            tracing::error!("Registration failed: {}", e);
            Redirect::to("/auth/register?error=unavailable").into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// The marketplace token is stateless, so logging out only destroys the
/// local session.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = sign_out(&session).await {
        tracing::error!("Failed to flush session: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}
