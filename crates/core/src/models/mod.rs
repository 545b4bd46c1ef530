//! Records mirrored from the hosted backend.
//!
//! Field names match the backend column names so the records deserialize
//! directly from row-API responses. Insert payloads (`New*`) carry only the
//! columns the client is allowed to set; ids and timestamps are assigned by
//! the backend.

pub mod order;
pub mod product;
pub mod profile;

pub use order::{DeliveryDetails, DeliveryDetailsError, NewOrder, NewOrderItem, Order, OrderItem};
pub use product::{Product, ProductInput, ProductInputError};
pub use profile::{Profile, ProfileUpdate};
