//! `orders` and `order_items` tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DeliveryStatus, OrderId, OrderItemId, OrderStatus, ProductId, ProfileId};

/// An order row.
///
/// Delivery columns were added after the first orders were taken, so they
/// are all optional on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: ProfileId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_contact: Option<String>,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    #[serde(default)]
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the order has been handed over to the customer.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.delivery_status == Some(DeliveryStatus::Delivered)
    }
}

/// An `order_items` row. `unit_price` is the price at the time of ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// `quantity * unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Errors from validating checkout delivery details.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryDetailsError {
    #[error("delivery address is required")]
    MissingAddress,
    #[error("contact number is required")]
    MissingContact,
}

/// Where and how to deliver an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub contact: String,
    pub instructions: Option<String>,
}

impl DeliveryDetails {
    /// Validate checkout form values.
    ///
    /// # Errors
    ///
    /// Returns an error if the address or contact is blank.
    pub fn parse(
        address: &str,
        contact: &str,
        instructions: Option<&str>,
    ) -> Result<Self, DeliveryDetailsError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(DeliveryDetailsError::MissingAddress);
        }
        let contact = contact.trim();
        if contact.is_empty() {
            return Err(DeliveryDetailsError::MissingContact);
        }
        Ok(Self {
            address: address.to_owned(),
            contact: contact.to_owned(),
            instructions: instructions
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        })
    }
}

/// Insert body for a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub user_id: ProfileId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub delivery_contact: String,
    pub delivery_instructions: Option<String>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub delivery_status: DeliveryStatus,
}

impl NewOrder {
    /// A freshly placed order: status and delivery status both `pending`.
    #[must_use]
    pub fn pending(
        user_id: ProfileId,
        total_amount: Decimal,
        delivery: &DeliveryDetails,
        estimated_delivery_time: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            total_amount,
            status: OrderStatus::Pending,
            delivery_address: delivery.address.clone(),
            delivery_contact: delivery.contact.clone(),
            delivery_instructions: delivery.instructions.clone(),
            estimated_delivery_time,
            delivery_status: DeliveryStatus::Pending,
        }
    }
}

/// Insert body for one line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_order_without_delivery_columns() {
        let json = r#"{
            "id": "9f1d8c6a-0000-4000-8000-000000000001",
            "user_id": "0b8a4c52-6a7d-4d34-9e0a-1f5f0c7c2a11",
            "status": "confirmed",
            "total_amount": 1200,
            "created_at": "2024-03-01T10:00:00+00:00",
            "updated_at": "2024-03-01T11:00:00+00:00"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert!(order.delivery_status.is_none());
        assert!(!order.is_delivered());
    }

    #[test]
    fn test_delivery_details_validation() {
        assert_eq!(
            DeliveryDetails::parse(" ", "98450", None),
            Err(DeliveryDetailsError::MissingAddress)
        );
        assert_eq!(
            DeliveryDetails::parse("12 MG Road", "", None),
            Err(DeliveryDetailsError::MissingContact)
        );
        let details = DeliveryDetails::parse("12 MG Road", " 98450 ", Some("  ")).unwrap();
        assert_eq!(details.contact, "98450");
        assert_eq!(details.instructions, None);
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem {
            id: OrderItemId::random(),
            order_id: OrderId::random(),
            product_id: ProductId::random(),
            quantity: 3,
            unit_price: Decimal::new(1250, 1),
            created_at: Utc::now(),
        };
        assert_eq!(item.line_total(), Decimal::new(3750, 1));
    }
}
