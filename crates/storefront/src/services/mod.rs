//! Storefront operations on top of the backend client.
//!
//! # Services
//!
//! - `catalog` - Product listing (cached)
//! - `checkout` - Placing orders and rendering invoices
//! - `orders` - Order tracking for the signed-in customer
//! - `profile` - Profile name updates
//! - `admin` - Product and order management, dashboard numbers

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod profile;

pub use admin::{AdminError, AdminService, DashboardStats};
pub use catalog::{CatalogError, CatalogService};
pub use checkout::{CheckoutError, Invoice, PlacedOrder, place_order};
pub use orders::{OrdersError, delivery_eta, my_orders, order_eta};
pub use profile::{PROFILE_UPDATED_MESSAGE, ProfileError};
