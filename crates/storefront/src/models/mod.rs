//! Storefront-side models: the signed-in user and joined read shapes.

pub mod order;
pub mod user;

pub use order::{
    ADMIN_ORDER_SELECT, AdminOrder, AdminOrderItem, ORDER_WITH_ITEMS_SELECT, OrderItemWithProduct,
    OrderWithItems, ProductName, ProfileSummary,
};
pub use user::CurrentUser;
