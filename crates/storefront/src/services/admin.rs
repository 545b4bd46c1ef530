//! Admin panel operations.
//!
//! Every operation needs an admin user. [`AdminService::new`] checks the role
//! locally; the backend enforces the same rule through row-level security.

use std::collections::HashSet;

use indian_flavour_core::{
    OrderId, OrderStatus, Product, ProductId, ProductInput, ProductInputError, ProfileId,
};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::backend::{BackendClient, BackendError, Direction};
use crate::models::{ADMIN_ORDER_SELECT, AdminOrder, CurrentUser};
use crate::services::catalog::CatalogService;

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("you do not have access to this page")]
    Forbidden,

    #[error("{0}")]
    InvalidProduct(#[from] ProductInputError),

    #[error("Product not found")]
    ProductNotFound(ProductId),

    #[error("Order not found")]
    OrderNotFound(OrderId),

    #[error("Failed to {action}")]
    Backend {
        action: &'static str,
        #[source]
        source: BackendError,
    },
}

fn backend(action: &'static str) -> impl FnOnce(BackendError) -> AdminError {
    move |source| {
        error!(error = %source, "Failed to {action}");
        AdminError::Backend { action, source }
    }
}

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total_orders: usize,
    pub pending_orders: usize,
    /// Sum of order totals, cancelled orders excluded.
    pub revenue: Decimal,
    /// Distinct customers who have ordered.
    pub customers: usize,
    pub products: usize,
}

/// The order columns the dashboard needs.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSummary {
    pub user_id: ProfileId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
}

impl DashboardStats {
    #[must_use]
    pub fn compute(orders: &[OrderSummary], products: usize) -> Self {
        let customers: HashSet<ProfileId> = orders.iter().map(|o| o.user_id).collect();
        Self {
            total_orders: orders.len(),
            pending_orders: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            revenue: orders
                .iter()
                .filter(|o| o.status.is_billable())
                .map(|o| o.total_amount)
                .sum(),
            customers: customers.len(),
            products,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusPatch {
    status: OrderStatus,
}

/// Admin operations, bound to an admin's backend client.
#[derive(Debug)]
pub struct AdminService<'a> {
    client: &'a BackendClient,
    catalog: &'a CatalogService,
}

impl<'a> AdminService<'a> {
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` unless `user` is an admin.
    pub fn new(
        user: &CurrentUser,
        client: &'a BackendClient,
        catalog: &'a CatalogService,
    ) -> Result<Self, AdminError> {
        if !user.is_admin() {
            return Err(AdminError::Forbidden);
        }
        Ok(Self { client, catalog })
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// All products, newest first, read fresh (not from the catalog cache).
    ///
    /// # Errors
    ///
    /// Returns an error if the products cannot be loaded.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, AdminError> {
        self.client
            .from("products")
            .select("*")
            .order("created_at", Direction::Descending)
            .fetch()
            .await
            .map_err(backend("load products"))
    }

    /// # Errors
    ///
    /// Returns an error if the insert is rejected.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, AdminError> {
        let product: Product = self
            .client
            .from("products")
            .insert_one(input)
            .await
            .map_err(backend("create product"))?;
        self.catalog.invalidate().await;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ProductNotFound` if no product has this id.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, AdminError> {
        let updated: Vec<Product> = self
            .client
            .from("products")
            .eq("id", id)
            .update(input)
            .await
            .map_err(backend("update product"))?;
        self.catalog.invalidate().await;
        let product = updated
            .into_iter()
            .next()
            .ok_or(AdminError::ProductNotFound(id))?;
        info!("Product updated");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns an error if the delete is rejected (e.g. the product is still
    /// referenced by order items).
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AdminError> {
        self.client
            .from("products")
            .eq("id", id)
            .delete()
            .await
            .map_err(backend("delete product"))?;
        self.catalog.invalidate().await;
        info!("Product deleted");
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// All orders, newest first, with customer and item details.
    ///
    /// # Errors
    ///
    /// Returns an error if the orders cannot be loaded.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<AdminOrder>, AdminError> {
        self.client
            .from("orders")
            .select(ADMIN_ORDER_SELECT)
            .order("created_at", Direction::Descending)
            .fetch()
            .await
            .map_err(backend("load orders"))
    }

    /// Move an order to `status`. Any status may follow any other.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if no order has this id.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), AdminError> {
        let updated: Vec<serde_json::Value> = self
            .client
            .from("orders")
            .select("id")
            .eq("id", id)
            .update(&StatusPatch { status })
            .await
            .map_err(backend("update order status"))?;
        if updated.is_empty() {
            return Err(AdminError::OrderNotFound(id));
        }
        info!("Order status updated");
        Ok(())
    }

    /// Dashboard numbers from the order and product listings.
    ///
    /// # Errors
    ///
    /// Returns an error if either listing cannot be loaded.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardStats, AdminError> {
        let (orders, products) = tokio::try_join!(
            async {
                self.client
                    .from("orders")
                    .select("user_id,status,total_amount")
                    .fetch::<OrderSummary>()
                    .await
                    .map_err(backend("load dashboard"))
            },
            async {
                self.client
                    .from("products")
                    .select("id")
                    .fetch::<IgnoredAny>()
                    .await
                    .map_err(backend("load dashboard"))
            },
        )?;
        Ok(DashboardStats::compute(&orders, products.len()))
    }
}
