//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors and transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (fills `request_id` on the span)
//! 4. CSP nonce (per-request nonce for scripts)
//! 5. Session layer (tower-sessions with `MemoryStore`)
//! 6. Security headers (CSP with nonce, frame and referrer policy)
//!
//! Rate limiting (governor) wraps only the login and registration handlers.

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, RequireStoreCandidate, sign_in, sign_out,
};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{make_request_span, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
