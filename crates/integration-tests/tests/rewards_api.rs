//! Integration tests for check-ins, purchases and visits.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;

use loyalty_core::RewardsConfig;
use loyalty_integration_tests::{TestApp, TestResponse, decimal};

async fn purchase(app: &TestApp, customer: &str, amount: serde_json::Value) -> TestResponse {
    app.request(
        Method::POST,
        "/api/rewards/purchase",
        Some(json!({
            "customerId": customer,
            "merchantId": "cafe",
            "purchaseAmount": amount,
        })),
    )
    .await
}

async fn stored_total(app: &TestApp) -> Decimal {
    app.store
        .all_entries()
        .await
        .iter()
        .map(|e| e.total_spent)
        .sum()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints_need_no_caller() {
    let app = TestApp::new();

    let live = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(live.status, StatusCode::OK);

    let ready = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_api_requires_caller() {
    let app = TestApp::with_merchant("cafe").await;

    let response = app
        .send(
            Method::POST,
            "/api/rewards/check-in",
            Some(json!({"customerId": "alice", "merchantId": "cafe"})),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(
        response.body["error"]
            .as_str()
            .unwrap()
            .contains("Unauthorized")
    );
    assert!(app.store.all_entries().await.is_empty());
}

// ============================================================================
// Check-in
// ============================================================================

#[tokio::test]
async fn test_check_in_creates_entry() {
    let app = TestApp::with_merchant("cafe").await;

    let response = app
        .request(
            Method::POST,
            "/api/rewards/check-in",
            Some(json!({"customerId": "alice", "merchantId": "cafe"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let entry = &response.body;
    assert_eq!(entry["customerId"], "alice");
    assert_eq!(entry["merchantId"], "cafe");
    assert_eq!(decimal(&entry["totalSpent"]), Decimal::ZERO);
    assert_eq!(entry["purchaseCount"], 0);
    assert_eq!(decimal(&entry["currentDiscount"]["amount"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_duplicate_check_in_conflicts() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", None).await;

    let response = app
        .request(
            Method::POST,
            "/api/rewards/check-in",
            Some(json!({"customerId": "alice", "merchantId": "cafe", "totalSpent": "999"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    let entries = app.store.all_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].total_spent, Decimal::ZERO);
}

#[tokio::test]
async fn test_check_in_at_unknown_merchant() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/api/rewards/check-in",
            Some(json!({"customerId": "alice", "merchantId": "nowhere"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_check_in_rejects_bad_seed() {
    let app = TestApp::with_merchant("cafe").await;

    let response = app
        .request(
            Method::POST,
            "/api/rewards/check-in",
            Some(json!({"customerId": "alice", "merchantId": "cafe", "purchaseCount": -1})),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.store.all_entries().await.is_empty());
}

// ============================================================================
// Purchases
// ============================================================================

#[tokio::test]
async fn test_purchase_crossing_silver_upgrades() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("80")).await;

    let response = purchase(&app, "alice", json!("30")).await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["customerUpgraded"], true);
    let entry = &response.body["updatedEntry"];
    assert_eq!(decimal(&entry["totalSpent"]), Decimal::from(110));
    assert_eq!(entry["purchaseCount"], 1);
    assert_eq!(decimal(&entry["currentDiscount"]["amount"]), Decimal::from(5));
}

#[tokio::test]
async fn test_purchase_within_tier_does_not_upgrade() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("440")).await;
    // Reach Silver first so the entry carries discount 5
    assert_eq!(purchase(&app, "alice", json!("10")).await.status, StatusCode::OK);

    let response = purchase(&app, "alice", json!(10)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["customerUpgraded"], false);
    let entry = &response.body["updatedEntry"];
    assert_eq!(decimal(&entry["totalSpent"]), Decimal::from(460));
    assert_eq!(decimal(&entry["currentDiscount"]["amount"]), Decimal::from(5));
}

#[tokio::test]
async fn test_unparseable_amount_leaves_storage_untouched() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("80")).await;
    let before = app.store.all_entries().await;

    let response = purchase(&app, "alice", json!("abc")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.all_entries().await, before);
}

#[tokio::test]
async fn test_malformed_purchase_bodies_are_bad_requests() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("80")).await;
    let before = app.store.all_entries().await;

    let bodies = [
        json!({"customerId": "alice", "merchantId": "cafe", "purchaseAmount": true}),
        json!({"customerId": "alice", "merchantId": "cafe", "purchaseAmount": null}),
        json!({"customerId": "alice", "merchantId": "cafe"}),
    ];
    for body in bodies {
        let response = app
            .request(Method::POST, "/api/rewards/purchase", Some(body.clone()))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response.body["error"].is_string(), "{body}");
    }

    assert_eq!(app.store.all_entries().await, before);
}

#[tokio::test]
async fn test_malformed_check_in_and_visit_bodies_are_bad_requests() {
    let app = TestApp::with_merchant("cafe").await;

    let check_in = app
        .request(
            Method::POST,
            "/api/rewards/check-in",
            Some(json!({"customerId": "alice", "totalSpent": false})),
        )
        .await;
    assert_eq!(check_in.status, StatusCode::BAD_REQUEST);
    assert!(check_in.body["error"].is_string());

    let visit = app
        .request(
            Method::POST,
            "/api/rewards/visit",
            Some(json!({"customerId": 7, "merchantId": "cafe"})),
        )
        .await;
    assert_eq!(visit.status, StatusCode::BAD_REQUEST);
    assert!(visit.body["error"].is_string());

    assert!(app.store.all_entries().await.is_empty());
}

#[tokio::test]
async fn test_digit_separators_are_not_numbers() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("80")).await;

    let response = purchase(&app, "alice", json!("1_000")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_total(&app).await, Decimal::from(80));
}

#[tokio::test]
async fn test_amounts_beyond_ledger_capacity_are_bad_requests() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("80")).await;

    let response = purchase(&app, "alice", json!("1e20")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Each amount fits, but the running total would not
    let near_cap = purchase(&app, "alice", json!("999999999999999900")).await;
    assert_eq!(near_cap.status, StatusCode::OK);
    let overflow = purchase(&app, "alice", json!("100")).await;
    assert_eq!(overflow.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        stored_total(&app).await,
        Decimal::from(999_999_999_999_999_980_i64)
    );

    let seeded = app
        .request(
            Method::POST,
            "/api/rewards/check-in",
            Some(json!({"customerId": "bob", "merchantId": "cafe", "totalSpent": "1e18"})),
        )
        .await;
    assert_eq!(seeded.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_purchase_without_entry_is_not_found() {
    let app = TestApp::with_merchant("cafe").await;

    let response = purchase(&app, "ghost", json!("30")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"].as_str().unwrap().contains("ledger entry"));
    assert!(app.store.all_entries().await.is_empty());
}

#[tokio::test]
async fn test_purchase_without_tiers_is_precondition_failed() {
    let app = TestApp::new();
    app.add_merchant("cafe", RewardsConfig::default()).await;
    app.check_in("alice", "cafe", Some("80")).await;

    let response = purchase(&app, "alice", json!("30")).await;

    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
    let entries = app.store.all_entries().await;
    assert_eq!(entries[0].total_spent, Decimal::from(80));
    assert_eq!(entries[0].purchase_count, 0);
}

#[tokio::test]
async fn test_purchase_rounds_to_cents() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("10.10")).await;

    let response = purchase(&app, "alice", json!("0.205")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        decimal(&response.body["updatedEntry"]["totalSpent"]),
        Decimal::new(1031, 2)
    );
}

#[tokio::test]
async fn test_concurrent_purchases_are_all_applied() {
    let app = std::sync::Arc::new(TestApp::with_merchant("cafe").await);
    app.check_in("alice", "cafe", None).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = std::sync::Arc::clone(&app);
        handles.push(tokio::spawn(async move {
            purchase(&app, "alice", json!("25")).await.status
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let entries = app.store.all_entries().await;
    assert_eq!(entries[0].purchase_count, 20);
    assert_eq!(stored_total(&app).await, Decimal::from(500));
    assert_eq!(entries[0].current_discount.amount, Decimal::from(15));
}

// ============================================================================
// Visits and lookup
// ============================================================================

#[tokio::test]
async fn test_visit_touches_last_visit_only() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("80")).await;
    let before = app.store.all_entries().await.remove(0);

    let response = app
        .request(
            Method::POST,
            "/api/rewards/visit",
            Some(json!({"customerId": "alice", "merchantId": "cafe"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let after = app.store.all_entries().await.remove(0);
    assert!(after.last_visit >= before.last_visit);
    assert_eq!(after.total_spent, before.total_spent);
    assert_eq!(after.purchase_count, before.purchase_count);
    assert_eq!(after.version, before.version + 1);
}

#[tokio::test]
async fn test_visit_without_entry_is_not_found() {
    let app = TestApp::with_merchant("cafe").await;

    let response = app
        .request(
            Method::POST,
            "/api/rewards/visit",
            Some(json!({"customerId": "alice", "merchantId": "cafe"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_summary_reports_progress() {
    let app = TestApp::with_merchant("cafe").await;
    app.check_in("alice", "cafe", Some("110")).await;

    let response = app
        .request(Method::GET, "/api/rewards/cafe/alice", None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let progress = &response.body["progress"];
    assert_eq!(progress["currentTier"]["name"], "Silver");
    assert_eq!(progress["nextTier"]["name"], "Gold");
    assert_eq!(decimal(&progress["remainingToNext"]), Decimal::from(390));
    assert_eq!(response.body["entry"]["customerId"], "alice");
}

#[tokio::test]
async fn test_summary_for_unknown_customer() {
    let app = TestApp::with_merchant("cafe").await;

    let response = app
        .request(Method::GET, "/api/rewards/cafe/nobody", None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
