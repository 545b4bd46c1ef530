//! Persisted cart store.
//!
//! Wraps the core [`Cart`] and writes the whole cart to local storage after
//! every mutation, under the fixed key [`CART_STORAGE_KEY`]. The stored value
//! is an envelope of the form:
//!
//! ```json
//! { "state": { "items": [ { "id": "...", "name": "...", "price": "...", "quantity": 2 } ] }, "version": 0 }
//! ```

use indian_flavour_core::{Cart, CartLine, Product, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{LocalStorage, StorageError, read_json, write_json};

/// Local storage key for the cart.
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// Envelope version written by this store.
const CART_STORAGE_VERSION: u32 = 0;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCart {
    #[serde(default)]
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    items: Vec<CartLine>,
}

/// The cart, kept in sync with local storage.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    cart: Cart,
}

impl<S: LocalStorage> CartStore<S> {
    /// Open the store and restore any saved cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the saved cart is
    /// malformed.
    pub fn load(storage: S) -> Result<Self, StorageError> {
        let mut store = Self {
            storage,
            cart: Cart::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Re-read the saved cart, replacing the in-memory one.
    ///
    /// A missing entry yields an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the saved cart is
    /// malformed.
    pub fn reload(&mut self) -> Result<(), StorageError> {
        let persisted: Option<PersistedCart> = read_json(&self.storage, CART_STORAGE_KEY)?;
        let items = persisted.map(|p| p.state.items).unwrap_or_default();
        self.cart = Cart::from_lines(items);
        debug!(lines = self.cart.lines().len(), "Cart loaded");
        Ok(())
    }

    /// The current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.cart.total()
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn add_item(&mut self, product: &Product) -> Result<(), StorageError> {
        self.cart.add_item(product);
        self.save()
    }

    /// Remove a product's line. Absent ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), StorageError> {
        self.cart.remove_item(product_id);
        self.save()
    }

    /// Set an absolute quantity (zero removes the line).
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), StorageError> {
        self.cart.update_quantity(product_id, quantity);
        self.save()
    }

    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn increment(&mut self, product_id: ProductId) -> Result<(), StorageError> {
        self.cart.increment(product_id);
        self.save()
    }

    /// Decrement a line, stopping at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn decrement(&mut self, product_id: ProductId) -> Result<(), StorageError> {
        self.cart.decrement(product_id);
        self.save()
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.cart.clear();
        self.save()
    }

    fn save(&self) -> Result<(), StorageError> {
        let envelope = PersistedCart {
            state: PersistedState {
                items: self.cart.lines().to_vec(),
            },
            version: CART_STORAGE_VERSION,
        };
        write_json(&self.storage, CART_STORAGE_KEY, &envelope)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::storage::MemoryStorage;

    fn product(name: &str, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::random(),
            name: name.to_owned(),
            description: Some("house special".to_owned()),
            price: Decimal::from(price),
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_missing_entry_loads_empty() {
        let store = CartStore::load(MemoryStorage::new()).unwrap();
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_mutations_survive_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let pakora = product("Pakora Platter", 350);
        let chai = product("Masala Chai", 30);

        let mut store = CartStore::load(Arc::clone(&storage)).unwrap();
        store.add_item(&pakora).unwrap();
        store.add_item(&pakora).unwrap();
        store.add_item(&chai).unwrap();
        store.update_quantity(chai.id, 10).unwrap();

        let reopened = CartStore::load(Arc::clone(&storage)).unwrap();
        assert_eq!(reopened.cart(), store.cart());
        assert_eq!(reopened.total(), Decimal::from(2 * 350 + 10 * 30));
    }

    #[test]
    fn test_envelope_shape() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = CartStore::load(Arc::clone(&storage)).unwrap();
        let naan = product("Butter Naan", 45);
        store.add_item(&naan).unwrap();

        let raw = storage.get(CART_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["items"][0]["id"], naan.id.to_string());
        assert_eq!(value["state"]["items"][0]["quantity"], 1);
    }

    #[test]
    fn test_envelope_without_items_loads_empty() {
        let storage = MemoryStorage::new();
        storage.set(CART_STORAGE_KEY, r#"{"state":{}}"#).unwrap();
        let store = CartStore::load(storage).unwrap();
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_malformed_entry_is_an_error() {
        let storage = MemoryStorage::new();
        storage.set(CART_STORAGE_KEY, "{oops").unwrap();
        assert!(matches!(
            CartStore::load(storage),
            Err(StorageError::Malformed { .. })
        ));
    }

    #[test]
    fn test_clear_persists_empty_cart() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = CartStore::load(Arc::clone(&storage)).unwrap();
        store.add_item(&product("Kheer", 90)).unwrap();
        store.clear().unwrap();

        let reopened = CartStore::load(storage).unwrap();
        assert!(reopened.cart().is_empty());
    }
}
