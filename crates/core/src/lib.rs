//! OCOP Market Core - Domain types and pure logic.
//!
//! This crate is shared by the storefront binary and its integration tests:
//! - `storefront` - Customer-facing web client of the marketplace
//! - `integration-tests` - End-to-end tests against a fake marketplace API
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no clocks. Everything here is total over its inputs, which keeps
//! role checks and address selection testable in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, users and roles, emails, prices
//! - [`access`] - Role predicates and the post-login dispatch policy
//! - [`address`] - Province/district/ward hierarchy and the selection cascade

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod address;
pub mod types;

pub use access::{
    Landing, can_access_admin_page, get_role, is_admin, is_seller, post_login_destination,
};
pub use address::{
    AddressCascade, Applied, District, Province, ResolvedAddress, Ticket, Ward,
};
pub use types::*;
