//! The shopping cart.
//!
//! A cart is an ordered list of lines, one per product, each holding a
//! snapshot of the product as it was when added plus a quantity. The
//! snapshot price is what checkout charges.
//!
//! Invariants:
//! - at most one line per product id
//! - every line has `quantity >= 1`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::types::ProductId;

/// A product paired with a requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product id (stored as `id`, mirroring the product record).
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    pub quantity: u32,
}

impl CartLine {
    fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            quantity: 1,
        }
    }

    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Rebuild a cart from stored lines.
    ///
    /// Lines with quantity 0 are dropped and duplicate product ids are merged
    /// (quantities summed) so the invariants hold for whatever was stored.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.position(line.product_id) {
                Some(idx) => {
                    if let Some(existing) = cart.items.get_mut(idx) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => cart.items.push(line),
            }
        }
        cart
    }

    /// Add one unit of `product`.
    ///
    /// Increments the quantity of an existing line, otherwise appends a new
    /// line with quantity 1.
    pub fn add_item(&mut self, product: &Product) {
        if let Some(line) = self.line_mut(product.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.items.push(CartLine::from_product(product));
        }
    }

    /// Remove the line for `product_id`. Absent ids are ignored.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.items.retain(|line| line.product_id != product_id);
    }

    /// Set an absolute quantity. Absent ids are ignored; zero removes the line.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(product_id);
        } else if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        }
    }

    /// Add one to a line's quantity.
    pub fn increment(&mut self, product_id: ProductId) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = line.quantity.saturating_add(1);
        }
    }

    /// Subtract one from a line's quantity, never going below 1.
    pub fn decrement(&mut self, product_id: ProductId) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = line.quantity.saturating_sub(1).max(1);
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.items
    }

    /// The line for `product_id`, if any.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|line| line.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.items
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(name: &str, price: Decimal) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::random(),
            name: name.to_owned(),
            description: None,
            price,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_adding_same_product_twice_yields_quantity_two() {
        let samosa = product("Samosa", Decimal::from(40));
        let mut cart = Cart::new();
        cart.add_item(&samosa);
        cart.add_item(&samosa);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(samosa.id).unwrap().quantity, 2);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let a = product("Samosa", Decimal::from(40));
        let b = product("Lassi", Decimal::from(60));
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&b);
        cart.add_item(&a);

        let names: Vec<_> = cart.lines().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Samosa", "Lassi"]);
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let a = product("Samosa", Decimal::from(40));
        let mut cart = Cart::new();
        cart.add_item(&a);
        let before = cart.clone();

        cart.remove_item(ProductId::random());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_deletes_line() {
        let a = product("Samosa", Decimal::from(40));
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.remove_item(a.id);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_sets_absolute_value() {
        let a = product("Biryani Tray", Decimal::from(1500));
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.update_quantity(a.id, 7);
        assert_eq!(cart.line(a.id).unwrap().quantity, 7);

        cart.update_quantity(ProductId::random(), 3);
        assert_eq!(cart.lines().len(), 1);

        cart.update_quantity(a.id, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_decrement_clamps_at_one() {
        let a = product("Samosa", Decimal::from(40));
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.decrement(a.id);
        assert_eq!(cart.line(a.id).unwrap().quantity, 1);
        cart.increment(a.id);
        cart.increment(a.id);
        cart.decrement(a.id);
        assert_eq!(cart.line(a.id).unwrap().quantity, 2);
    }

    #[test]
    fn test_total_is_sum_of_price_times_quantity() {
        let a = product("Samosa", Decimal::new(4050, 2));
        let b = product("Gulab Jamun", Decimal::new(1999, 2));
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&a);
        cart.add_item(&b);
        cart.update_quantity(b.id, 3);

        // 2 * 40.50 + 3 * 19.99
        assert_eq!(cart.total(), Decimal::new(14097, 2));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_empty_total_is_zero() {
        assert_eq!(Cart::new().total(), Decimal::ZERO);
    }

    #[test]
    fn test_clear_empties_list() {
        let mut cart = Cart::new();
        cart.add_item(&product("Samosa", Decimal::from(40)));
        cart.add_item(&product("Lassi", Decimal::from(60)));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_from_lines_repairs_invariants() {
        let a = product("Samosa", Decimal::from(40));
        let mut line = CartLine::from_product(&a);
        line.quantity = 2;
        let mut dup = line.clone();
        dup.quantity = 3;
        let mut zero = CartLine::from_product(&product("Lassi", Decimal::from(60)));
        zero.quantity = 0;

        let cart = Cart::from_lines(vec![line, zero, dup]);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(a.id).unwrap().quantity, 5);
    }
}
