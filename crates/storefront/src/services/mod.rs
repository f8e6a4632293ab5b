//! Business logic services for storefront.
//!
//! # Services
//!
//! - `address` - Per-form province/district/ward cascades for store onboarding

pub mod address;
