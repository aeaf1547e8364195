//! Integration test harness for the Loyalty POS HTTP API.
//!
//! Drives the real router in process over in-memory storage, so the tests
//! need no database or running server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p loyalty-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use loyalty_core::{MerchantId, RewardsConfig, RewardsTier};
use loyalty_server::config::ServerConfig;
use loyalty_server::db::{InMemoryStore, MerchantStore};
use loyalty_server::middleware::CALLER_HEADER;
use loyalty_server::state::AppState;

/// Caller identity sent with every API request unless a test opts out.
pub const TEST_CALLER: &str = "pos-terminal-1";

/// A router over fresh in-memory storage.
pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    router: Router,
}

/// Status and decoded JSON body of a response.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Create an app with no merchants.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(&ServerConfig::in_memory(), store.clone(), store.clone());
        Self {
            store,
            router: loyalty_server::app(state),
        }
    }

    /// Create an app with one merchant using [`standard_tiers`].
    pub async fn with_merchant(merchant_id: &str) -> Self {
        let app = Self::new();
        app.add_merchant(merchant_id, standard_tiers()).await;
        app
    }

    /// Insert or replace a merchant directly in storage.
    pub async fn add_merchant(&self, merchant_id: &str, rewards: RewardsConfig) {
        self.store
            .upsert_merchant(&MerchantId::parse(merchant_id).unwrap(), merchant_id, &rewards)
            .await
            .unwrap();
    }

    /// Send a request as [`TEST_CALLER`].
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.send(method, uri, body, Some(TEST_CALLER)).await
    }

    /// Send a request with an explicit caller header, or none.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        caller: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder.header(CALLER_HEADER, caller);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }

    /// Check a customer in through the API and assert it succeeded.
    pub async fn check_in(&self, customer_id: &str, merchant_id: &str, total_spent: Option<&str>) {
        let mut body = serde_json::json!({
            "customerId": customer_id,
            "merchantId": merchant_id,
        });
        if let Some(spent) = total_spent {
            body["totalSpent"] = Value::String(spent.to_owned());
        }
        let response = self
            .request(Method::POST, "/api/rewards/check-in", Some(body))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Tiers `[Base 0→0, Silver 100→5, Gold 500→15]`.
#[must_use]
pub fn standard_tiers() -> RewardsConfig {
    RewardsConfig {
        tiers: vec![
            RewardsTier::new("Base", Decimal::ZERO, Decimal::ZERO).unwrap(),
            RewardsTier::new("Silver", Decimal::from(100), Decimal::from(5)).unwrap(),
            RewardsTier::new("Gold", Decimal::from(500), Decimal::from(15)).unwrap(),
        ],
        discount_type: Some("percent".to_owned()),
        ..RewardsConfig::default()
    }
}

/// Read a decimal serialized as a JSON string or number.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("expected a decimal, got {other}"),
    }
}
