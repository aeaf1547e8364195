//! Customer rewards routes.
//!
//! Request bodies are loosely typed (amounts may arrive as JSON strings or
//! numbers) and are validated into service inputs before any lookup.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use loyalty_core::{CustomerId, MerchantId, RewardLedgerEntry};

use super::extract::ApiJson;
use crate::error::Result;
use crate::middleware::Caller;
use crate::services::{CheckInInput, LedgerSummary, PurchaseInput, PurchaseReceipt, RewardsError};
use crate::state::AppState;

/// A numeric field that clients send either as a string or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Text(String),
    Number(serde_json::Number),
}

impl LooseNumber {
    fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Body of `POST /api/rewards/check-in`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub customer_id: String,
    pub merchant_id: String,
    /// Spend carried over from an earlier system.
    pub total_spent: Option<LooseNumber>,
    pub purchase_count: Option<i64>,
}

/// Body of `POST /api/rewards/purchase`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub customer_id: String,
    pub merchant_id: String,
    pub purchase_amount: LooseNumber,
}

/// Body of `POST /api/rewards/visit`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRequest {
    pub customer_id: String,
    pub merchant_id: String,
}

fn parse_ids(customer_id: &str, merchant_id: &str) -> Result<(CustomerId, MerchantId)> {
    let customer_id = CustomerId::parse(customer_id)
        .map_err(|e| RewardsError::InvalidInput(e.to_string()))?;
    let merchant_id = MerchantId::parse(merchant_id)
        .map_err(|e| RewardsError::InvalidInput(e.to_string()))?;
    Ok((customer_id, merchant_id))
}

/// Create a ledger entry on a customer's first check-in.
///
/// POST /api/rewards/check-in
///
/// # Errors
///
/// 400 on bad input, 404 if the merchant is unknown, 409 if the customer
/// already checked in here.
pub async fn check_in(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(body): ApiJson<CheckInRequest>,
) -> Result<(StatusCode, Json<RewardLedgerEntry>)> {
    let total_spent = body.total_spent.as_ref().map(LooseNumber::as_text);
    let input = CheckInInput::parse(
        &body.customer_id,
        &body.merchant_id,
        total_spent.as_deref(),
        body.purchase_count,
    )?;

    tracing::debug!(%caller, "Check-in requested");
    let entry = state.rewards().check_in(input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Apply a purchase to a customer's ledger entry.
///
/// POST /api/rewards/purchase
///
/// # Errors
///
/// 400 if the amount is not a number, 404 if the entry or merchant is
/// missing, 412 if the merchant has no tiers, 409 if concurrent updates
/// exhausted the retries.
pub async fn purchase(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(body): ApiJson<PurchaseRequest>,
) -> Result<Json<PurchaseReceipt>> {
    let input = PurchaseInput::parse(
        &body.customer_id,
        &body.merchant_id,
        &body.purchase_amount.as_text(),
    )?;

    tracing::debug!(%caller, "Purchase requested");
    let receipt = state.rewards().record_purchase(input).await?;
    Ok(Json(receipt))
}

/// Record a visit without a purchase.
///
/// POST /api/rewards/visit
///
/// # Errors
///
/// 404 if the customer never checked in at the merchant.
pub async fn visit(
    State(state): State<AppState>,
    _caller: Caller,
    ApiJson(body): ApiJson<VisitRequest>,
) -> Result<Json<RewardLedgerEntry>> {
    let (customer_id, merchant_id) = parse_ids(&body.customer_id, &body.merchant_id)?;
    let entry = state
        .rewards()
        .record_visit(&customer_id, &merchant_id)
        .await?;
    Ok(Json(entry))
}

/// A customer's ledger entry and tier progress at a merchant.
///
/// GET /api/rewards/{merchant_id}/{customer_id}
///
/// # Errors
///
/// 404 if the entry or merchant is missing.
pub async fn show(
    State(state): State<AppState>,
    _caller: Caller,
    Path((merchant_id, customer_id)): Path<(String, String)>,
) -> Result<Json<LedgerSummary>> {
    let (customer_id, merchant_id) = parse_ids(&customer_id, &merchant_id)?;
    let summary = state.rewards().summary(&customer_id, &merchant_id).await?;
    Ok(Json(summary))
}
