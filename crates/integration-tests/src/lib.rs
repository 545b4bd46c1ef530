//! End-to-end test harness for Indian Flavour.
//!
//! Each test starts a [`TestBackend`], a `wiremock` server answering the row
//! API (`/rest/v1`) and identity (`/auth/v1`) routes, and builds an
//! [`AppState`] pointed at it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p indian-flavour-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `shopping_flow` - sign in, cart, checkout and order history
//! - `admin_flow` - product management, order status, dashboard
//! - `persistence` - cart and session surviving a restart

use std::path::Path;
use std::sync::Arc;

use indian_flavour_storefront::AppState;
use indian_flavour_storefront::config::{BackendConfig, StorefrontConfig};
use indian_flavour_storefront::state::SharedStorage;
use indian_flavour_storefront::storage::MemoryStorage;
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CUSTOMER_ID: &str = "5f1c1b2e-8d0e-4a7f-9a51-0a4c1f3e2b10";
pub const CUSTOMER_EMAIL: &str = "priya@example.in";
pub const CUSTOMER_TOKEN: &str = "customer-jwt";

pub const ADMIN_ID: &str = "9b2d7c41-3e6f-4d8a-b5c2-7e1f0a9d4c63";
pub const ADMIN_EMAIL: &str = "kitchen@indianflavour.in";
pub const ADMIN_TOKEN: &str = "admin-jwt";

pub const PASSWORD: &str = "tandoori-42";

/// Fixed row timestamp.
pub const CREATED_AT: &str = "2024-03-01T12:00:00Z";

/// A signed-in account the mock backend knows about.
#[derive(Debug, Clone, Copy)]
pub struct Account {
    pub id: &'static str,
    pub email: &'static str,
    pub full_name: &'static str,
    pub role: &'static str,
    pub token: &'static str,
}

pub const CUSTOMER: Account = Account {
    id: CUSTOMER_ID,
    email: CUSTOMER_EMAIL,
    full_name: "Priya Sharma",
    role: "customer",
    token: CUSTOMER_TOKEN,
};

pub const ADMIN: Account = Account {
    id: ADMIN_ID,
    email: ADMIN_EMAIL,
    full_name: "Head Chef",
    role: "admin",
    token: ADMIN_TOKEN,
};

/// Mock hosted backend.
pub struct TestBackend {
    pub server: MockServer,
}

impl TestBackend {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    #[must_use]
    pub fn config(&self, state_dir: &Path) -> StorefrontConfig {
        let backend = BackendConfig::new(&self.server.uri(), SecretString::from("anon-test-key"))
            .expect("mock server URI is a valid backend URL");
        StorefrontConfig::new(backend, state_dir.to_path_buf())
    }

    /// App state over fresh in-memory storage.
    #[must_use]
    pub fn state(&self) -> (AppState, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let shared: SharedStorage = Arc::clone(&storage) as SharedStorage;
        (self.state_with(shared), storage)
    }

    #[must_use]
    pub fn state_with(&self, storage: SharedStorage) -> AppState {
        AppState::with_storage(self.config(Path::new(".flavour")), storage)
            .expect("HTTP clients build")
    }

    /// Accept `account`'s password, and answer its profile and user lookups.
    pub async fn mount_account(&self, account: Account) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_partial_json(json!({"email": account.email})))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(account)))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", format!("Bearer {}", account.token)))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body(account)))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{}", account.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": account.id,
                "full_name": account.full_name,
                "avatar_url": null,
                "role": account.role,
                "created_at": CREATED_AT,
                "updated_at": CREATED_AT
            }])))
            .mount(&self.server)
            .await;
    }

    /// Serve `products` as the menu and each one by id.
    pub async fn mount_products(&self, products: &[Value]) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(products))
            .mount(&self.server)
            .await;

        for product in products {
            let id = product["id"].as_str().unwrap_or_default();
            Mock::given(method("GET"))
                .and(path("/rest/v1/products"))
                .and(query_param("id", format!("eq.{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([product])))
                .mount(&self.server)
                .await;
        }
    }

    /// Requests received for `method path`, in arrival order.
    pub async fn requests_to(&self, verb: &str, route: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == route)
            .collect()
    }
}

fn user_body(account: Account) -> Value {
    json!({
        "id": account.id,
        "email": account.email,
        "user_metadata": {"full_name": account.full_name}
    })
}

fn token_body(account: Account) -> Value {
    json!({
        "access_token": account.token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("{}-refresh", account.token),
        "user": user_body(account)
    })
}

/// A `products` row.
#[must_use]
pub fn product_json(id: &str, name: &str, price: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "price": price,
        "image_url": null,
        "created_at": CREATED_AT,
        "updated_at": CREATED_AT
    })
}

/// An `orders` row as returned after insert.
#[must_use]
pub fn order_json(id: &str, user_id: &str, status: &str, total: &str) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "status": status,
        "total_amount": total,
        "delivery_address": "12 MG Road, Pune",
        "delivery_contact": "+91 98200 00000",
        "delivery_instructions": null,
        "estimated_delivery_time": "2024-03-01T14:00:00Z",
        "delivery_status": "pending",
        "created_at": CREATED_AT,
        "updated_at": CREATED_AT
    })
}
