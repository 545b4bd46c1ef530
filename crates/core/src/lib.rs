//! Indian Flavour Core - Shared types library.
//!
//! This crate provides the domain types used across all Indian Flavour components:
//! - `storefront` - Client library for the catering storefront (catalog, cart,
//!   checkout, order tracking, admin operations)
//! - `cli` - Command-line surface over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere, including in tests without a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`models`] - Records mirrored from the hosted backend tables
//! - [`cart`] - The shopping cart and its arithmetic

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod models;
pub mod types;

pub use cart::{Cart, CartLine};
pub use models::*;
pub use types::*;
