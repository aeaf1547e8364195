//! Caller identity extractor.
//!
//! Token verification happens in the auth gateway in front of this service.
//! The gateway forwards the verified user ID in [`CALLER_HEADER`]; requests
//! without it never reached a verifier and are rejected.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tracing::Span;

use crate::error::{AppError, set_sentry_user};

/// Header carrying the authenticated user ID.
pub const CALLER_HEADER: &str = "x-authenticated-user";

/// The authenticated caller of an API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

/// Rejection when no caller identity was forwarded.
#[derive(Debug)]
pub struct MissingCaller;

impl IntoResponse for MissingCaller {
    fn into_response(self) -> Response {
        AppError::Unauthorized("missing caller identity".to_string()).into_response()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = MissingCaller;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(MissingCaller)?
            .to_owned();

        Span::current().record("caller", caller.as_str());
        set_sentry_user(&caller);

        Ok(Self(caller))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;

    async fn extract(header: Option<&str>) -> Result<Caller, MissingCaller> {
        let mut builder = Request::builder().uri("/api/rewards/purchase");
        if let Some(value) = header {
            builder = builder.header(CALLER_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_caller_from_header() {
        let caller = extract(Some(" user-42 ")).await.unwrap();
        assert_eq!(caller, Caller("user-42".to_string()));
    }

    #[tokio::test]
    async fn test_missing_or_blank_caller_is_unauthorized() {
        for header in [None, Some(""), Some("   ")] {
            let rejection = extract(header).await.unwrap_err();
            assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }
}
