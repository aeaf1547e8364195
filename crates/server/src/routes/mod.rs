//! HTTP route handlers for the loyalty server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Liveness check
//! GET  /health/ready                             - Storage reachable
//!
//! # Rewards (requires caller)
//! POST /api/rewards/check-in                     - Create a ledger entry
//! POST /api/rewards/purchase                     - Apply a purchase
//! POST /api/rewards/visit                        - Touch last visit
//! GET  /api/rewards/{merchant_id}/{customer_id}  - Entry with tier progress
//!
//! # Merchants (requires caller)
//! GET  /api/merchants/{merchant_id}/rewards      - Rewards configuration
//! PUT  /api/merchants/{merchant_id}/rewards      - Replace configuration
//! GET  /api/merchants/{merchant_id}/customers    - Ledger entries by last visit
//! ```

pub mod extract;
pub mod health;
pub mod merchants;
pub mod rewards;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the rewards routes router.
pub fn rewards_routes() -> Router<AppState> {
    Router::new()
        .route("/check-in", post(rewards::check_in))
        .route("/purchase", post(rewards::purchase))
        .route("/visit", post(rewards::visit))
        .route("/{merchant_id}/{customer_id}", get(rewards::show))
}

/// Create the merchant routes router.
pub fn merchant_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{merchant_id}/rewards",
            get(merchants::rewards).put(merchants::update_rewards),
        )
        .route("/{merchant_id}/customers", get(merchants::customers))
}

/// Create all routes for the loyalty server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/rewards", rewards_routes())
        .nest("/api/merchants", merchant_routes())
}
