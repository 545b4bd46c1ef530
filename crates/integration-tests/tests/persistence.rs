//! Cart and session surviving a restart, on file storage.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use indian_flavour_core::{ProductId, ProfileId};
use indian_flavour_integration_tests::{
    CUSTOMER, CUSTOMER_EMAIL, CUSTOMER_ID, PASSWORD, TestBackend, product_json,
};
use indian_flavour_storefront::AppState;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const PAKORA_ID: &str = "0d2f4b6c-8e0a-4c2e-b4d6-f8a0c2e4b6d8";

#[tokio::test]
async fn test_cart_and_session_survive_restart() {
    let backend = TestBackend::start().await;
    backend.mount_account(CUSTOMER).await;
    backend
        .mount_products(&[product_json(PAKORA_ID, "Onion Pakora", "120.00")])
        .await;
    let dir = tempfile::tempdir().unwrap();

    {
        let state = AppState::new(backend.config(dir.path())).unwrap();
        let mut auth = state.auth_store();
        auth.sign_in(CUSTOMER_EMAIL, PASSWORD).await.unwrap();

        let mut cart = state.cart_store().unwrap();
        let pakora = state
            .catalog()
            .get_product(PAKORA_ID.parse().unwrap())
            .await
            .unwrap();
        cart.add_item(&pakora).unwrap();
        cart.add_item(&pakora).unwrap();
    }

    let raw = std::fs::read_to_string(dir.path().join("cart-storage.json")).unwrap();
    let saved: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved["version"], 0);
    assert_eq!(saved["state"]["items"][0]["quantity"], 2);

    let state = AppState::new(backend.config(dir.path())).unwrap();
    let mut auth = state.auth_store();
    let user = auth.load_user().await.unwrap().unwrap();
    assert_eq!(user.id, CUSTOMER_ID.parse::<ProfileId>().unwrap());
    assert_eq!(user.full_name.as_deref(), Some("Priya Sharma"));

    let pakora: ProductId = PAKORA_ID.parse().unwrap();
    let cart = state.cart_store().unwrap();
    assert_eq!(cart.cart().line(pakora).map(|l| l.quantity), Some(2));

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&backend.server)
        .await;
    auth.sign_out().await.unwrap();
    assert!(!dir.path().join("auth-session.json").exists());
    // Signing out leaves the cart alone
    assert!(dir.path().join("cart-storage.json").exists());
}

#[tokio::test]
async fn test_expired_session_is_refreshed_on_load() {
    let backend = TestBackend::start().await;
    backend.mount_account(CUSTOMER).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": CUSTOMER.token,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "rotated-refresh",
            "user": {"id": CUSTOMER_ID, "email": CUSTOMER_EMAIL}
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let stale = json!({
        "access_token": "stale-jwt",
        "refresh_token": "old-refresh",
        "expires_at": Utc::now() - Duration::hours(1),
        "user": {"id": CUSTOMER_ID, "email": CUSTOMER_EMAIL}
    });
    std::fs::write(dir.path().join("auth-session.json"), stale.to_string()).unwrap();

    let state = AppState::new(backend.config(dir.path())).unwrap();
    let mut auth = state.auth_store();
    assert!(auth.load_user().await.unwrap().is_some());

    let saved: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("auth-session.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved["refresh_token"], "rotated-refresh");
}

#[tokio::test]
async fn test_corrupt_session_file_signs_out() {
    let backend = TestBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("auth-session.json"), "{not json").unwrap();

    let state = AppState::new(backend.config(dir.path())).unwrap();
    let mut auth = state.auth_store();
    assert!(auth.load_user().await.unwrap().is_none());
    assert!(!dir.path().join("auth-session.json").exists());
    assert!(backend.server.received_requests().await.unwrap().is_empty());
}
