//! Request extractors whose rejections use the API error body.

use axum::extract::{FromRequest, rejection::JsonRejection};

use crate::error::AppError;
use crate::services::RewardsError;

/// JSON body extractor that reports malformed bodies as invalid input.
///
/// A body that is not JSON, or whose fields have the wrong shape, becomes a
/// 400 with `{"error": ...}` instead of axum's plain-text 4xx.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rewards(RewardsError::InvalidInput(rejection.body_text()))
    }
}
