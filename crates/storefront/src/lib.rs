//! Indian Flavour storefront library.
//!
//! Client-side logic for the catering storefront: the persisted cart, the
//! signed-in session, and direct calls to the hosted backend's row API and
//! identity service. Kept as a library so the CLI stays thin and everything
//! can be tested against mock servers.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod backend;
pub mod cart;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

pub use error::{AppError, Result};
pub use state::AppState;
