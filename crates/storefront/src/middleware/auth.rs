//! Authentication extractors and session helpers.
//!
//! The [`AuthState`] snapshot lives in the `tower-sessions` session under a
//! single key. Handlers read it through the extractors below and replace it
//! only through [`sign_in`] and [`sign_out`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{AuthSession, AuthState, session_keys};

/// Header HTMX sets on its requests.
const HX_REQUEST: &str = "hx-request";

/// Extractor that requires a signed-in user.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(session): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", session.user().display_name())
/// }
/// ```
pub struct RequireAuth(pub AuthSession);

/// Extractor that requires a signed-in administrator.
///
/// Anonymous visitors are sent to the login page, other users to the home page.
pub struct RequireAdmin(pub AuthSession);

/// Extractor for store onboarding: a signed-in user who may open a store.
///
/// Administrators are sent to the admin area and existing sellers to their
/// account page.
pub struct RequireStoreCandidate(pub AuthSession);

/// Extractor that reads the current auth state without rejecting anyone.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalAuth(auth): OptionalAuth) -> impl IntoResponse {
///     match auth.user() {
///         Some(user) => format!("Hello, {}!", user.display_name()),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub AuthState);

/// Error returned when a route's auth requirement is not met.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in; go to the login page.
    RedirectToLogin { htmx: bool },
    /// Signed in but not allowed here.
    RedirectTo { to: &'static str, htmx: bool },
    /// Session layer missing from the stack.
    Misconfigured,
}

fn redirect(to: &'static str, htmx: bool) -> Response {
    if htmx {
        // Full-page navigation instead of a redirect inside the XHR.
        let mut response = StatusCode::UNAUTHORIZED.into_response();
        response
            .headers_mut()
            .insert("hx-redirect", HeaderValue::from_static(to));
        response
    } else {
        Redirect::to(to).into_response()
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { htmx } => redirect("/auth/login", htmx),
            Self::RedirectTo { to, htmx } => redirect(to, htmx),
            Self::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

async fn load(parts: &Parts) -> Option<AuthState> {
    let session = parts.extensions.get::<Session>()?;
    let state = session
        .get::<AuthSession>(session_keys::AUTH)
        .await
        .inspect_err(|e| tracing::warn!("Failed to read auth session: {}", e))
        .ok()
        .flatten()
        .map_or(AuthState::Anonymous, AuthState::Authenticated);
    Some(state)
}

fn is_htmx(parts: &Parts) -> bool {
    parts.headers.contains_key(HX_REQUEST)
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(load(parts).await.unwrap_or_default()))
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = load(parts).await.ok_or(AuthRejection::Misconfigured)?;
        match state {
            AuthState::Authenticated(session) => Ok(Self(session)),
            AuthState::Anonymous => Err(AuthRejection::RedirectToLogin {
                htmx: is_htmx(parts),
            }),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(session) = RequireAuth::from_request_parts(parts, state).await?;
        if ocop_core::can_access_admin_page(session.user()) {
            Ok(Self(session))
        } else {
            Err(AuthRejection::RedirectTo {
                to: "/",
                htmx: is_htmx(parts),
            })
        }
    }
}

impl<S> FromRequestParts<S> for RequireStoreCandidate
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(session) = RequireAuth::from_request_parts(parts, state).await?;
        let user = session.user();

        let to = if ocop_core::is_admin(user) {
            "/admin"
        } else if ocop_core::is_seller(user) {
            "/account?error=already_seller"
        } else {
            return Ok(Self(session));
        };

        Err(AuthRejection::RedirectTo {
            to,
            htmx: is_htmx(parts),
        })
    }
}

/// Store a freshly authenticated state.
///
/// Cycles the session id on every login to prevent session fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in(
    session: &Session,
    state: &AuthState,
) -> Result<(), tower_sessions::session::Error> {
    match state.session() {
        Some(auth) => {
            session.cycle_id().await?;
            session.insert(session_keys::AUTH, auth).await
        }
        None => sign_out(session).await,
    }
}

/// Drop everything in the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
