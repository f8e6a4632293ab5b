//! Domain models for storefront.

pub mod session;

pub use session::{AuthSession, AuthState, keys as session_keys};
