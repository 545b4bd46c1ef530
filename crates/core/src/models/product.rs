//! `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// A dish or package on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors from validating admin product input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductInputError {
    #[error("product name is required")]
    MissingName,
    #[error("price must be a number: {0}")]
    InvalidPrice(String),
    #[error("price cannot be negative")]
    NegativePrice,
}

/// Validated insert/update body for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
}

impl ProductInput {
    /// Validate raw form values.
    ///
    /// Fields are trimmed; blank optional fields become `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ProductInputError`] if the name is blank or the price is not
    /// a non-negative decimal.
    pub fn parse(
        name: &str,
        description: Option<&str>,
        price: &str,
        image_url: Option<&str>,
    ) -> Result<Self, ProductInputError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProductInputError::MissingName);
        }

        let price_str = price.trim();
        let price: Decimal = price_str
            .parse()
            .map_err(|_| ProductInputError::InvalidPrice(price_str.to_owned()))?;
        if price.is_sign_negative() && !price.is_zero() {
            return Err(ProductInputError::NegativePrice);
        }

        Ok(Self {
            name: name.to_owned(),
            description: non_blank(description),
            price,
            image_url: non_blank(image_url),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_accepts_numeric_price() {
        let json = r#"{
            "id": "5a0e1d7e-2f0b-4b0e-8d8b-9a2d7b9f1c00",
            "name": "Paneer Tikka",
            "description": "Char-grilled cottage cheese",
            "price": 249.5,
            "image_url": null,
            "created_at": "2024-03-01T10:00:00.123456+00:00",
            "updated_at": "2024-03-01T10:00:00.123456+00:00"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Decimal::new(2495, 1));
    }

    #[test]
    fn test_input_parse_trims_and_blanks() {
        let input = ProductInput::parse("  Dal Makhani ", Some("  "), "180", Some("")).unwrap();
        assert_eq!(input.name, "Dal Makhani");
        assert_eq!(input.description, None);
        assert_eq!(input.image_url, None);
        assert_eq!(input.price, Decimal::from(180));
    }

    #[test]
    fn test_input_parse_rejects_bad_values() {
        assert_eq!(
            ProductInput::parse(" ", None, "10", None),
            Err(ProductInputError::MissingName)
        );
        assert_eq!(
            ProductInput::parse("Naan", None, "ten", None),
            Err(ProductInputError::InvalidPrice("ten".to_owned()))
        );
        assert_eq!(
            ProductInput::parse("Naan", None, "-1", None),
            Err(ProductInputError::NegativePrice)
        );
    }
}
