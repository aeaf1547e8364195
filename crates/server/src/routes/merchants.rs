//! Merchant rewards configuration routes.

use axum::{
    Json,
    extract::{Path, State},
};

use loyalty_core::{Merchant, MerchantId, RewardLedgerEntry, RewardsConfig};

use super::extract::ApiJson;
use crate::error::Result;
use crate::middleware::Caller;
use crate::services::RewardsError;
use crate::state::AppState;

fn parse_merchant_id(raw: &str) -> Result<MerchantId> {
    MerchantId::parse(raw).map_err(|e| RewardsError::InvalidInput(e.to_string()).into())
}

/// A merchant's rewards configuration.
///
/// GET /api/merchants/{merchant_id}/rewards
///
/// # Errors
///
/// 404 if the merchant does not exist.
pub async fn rewards(
    State(state): State<AppState>,
    _caller: Caller,
    Path(merchant_id): Path<String>,
) -> Result<Json<RewardsConfig>> {
    let merchant_id = parse_merchant_id(&merchant_id)?;
    let rewards = state.rewards().merchant_rewards(&merchant_id).await?;
    Ok(Json(rewards))
}

/// Replace a merchant's rewards configuration.
///
/// PUT /api/merchants/{merchant_id}/rewards
///
/// # Errors
///
/// 400 if a tier is invalid, 404 if the merchant does not exist.
pub async fn update_rewards(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(merchant_id): Path<String>,
    ApiJson(rewards): ApiJson<RewardsConfig>,
) -> Result<Json<Merchant>> {
    let merchant_id = parse_merchant_id(&merchant_id)?;
    tracing::info!(%caller, %merchant_id, "Replacing merchant rewards");
    let merchant = state
        .rewards()
        .update_merchant_rewards(&merchant_id, rewards)
        .await?;
    Ok(Json(merchant))
}

/// Every customer of a merchant, most recent visit first.
///
/// GET /api/merchants/{merchant_id}/customers
///
/// # Errors
///
/// 404 if the merchant does not exist.
pub async fn customers(
    State(state): State<AppState>,
    _caller: Caller,
    Path(merchant_id): Path<String>,
) -> Result<Json<Vec<RewardLedgerEntry>>> {
    let merchant_id = parse_merchant_id(&merchant_id)?;
    let entries = state.rewards().customers(&merchant_id).await?;
    Ok(Json(entries))
}
