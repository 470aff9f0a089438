//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`Context`]: the [`RequestContext`] forwarded on every outbound call
//! - [`ApiJson`] / [`ApiQuery`]: `Json` and `Query` whose rejections are
//!   [`AppError`] 400 responses
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     State(state): State<AppState>,
//!     Context(ctx): Context,
//!     ApiJson(input): ApiJson<CompositeIn>,
//! ) -> Result<Json<Composite>, AppError> {
//!     tracing::info!(correlation_id = %ctx.correlation_id(), "Processing request");
//!     ...
//! }
//! ```

use crate::error::AppError;
use crate::middleware::header_correlation_id;
use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header::AUTHORIZATION, request::Parts},
};
use composite_core::RequestContext;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the id stored by the correlation-id middleware, then the
/// `X-Correlation-ID` header, and generates a new UUID v4 otherwise.
/// Caller-supplied ids are kept verbatim, UUID or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Self>()
            .map(|Self(id)| id.clone())
            .or_else(|| header_correlation_id(&parts.headers))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self(correlation_id))
    }
}

/// Outbound request context: correlation id plus the caller's
/// `Authorization` header, verbatim, when present.
#[derive(Debug, Clone)]
pub struct Context(pub RequestContext);

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CorrelationId(correlation_id) = CorrelationId::from_request_parts(parts, state).await?;
        let ctx = RequestContext::new(correlation_id);
        let ctx = match parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some(authorization) => ctx.with_authorization(authorization),
            None => ctx,
        };
        Ok(Self(ctx))
    }
}

/// JSON body extractor that rejects with a 400 [`AppError`].
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))
    }
}

/// Query-string extractor that rejects with a 400 [`AppError`].
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use composite_core::CompositeFilter;

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = axum::http::Request::builder()
            .header("X-Correlation-ID", uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid.to_string());
    }

    #[tokio::test]
    async fn test_opaque_header_id_is_kept() {
        let req = axum::http::Request::builder()
            .header("X-Correlation-ID", "trace-abc-123")
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let Context(ctx) = Context::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(ctx.correlation_id(), "trace-abc-123");
    }

    #[tokio::test]
    async fn test_extension_wins_over_header() {
        let stored = CorrelationId("from-middleware".to_string());
        let mut req = axum::http::Request::builder()
            .header("X-Correlation-ID", Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");
        req.extensions_mut().insert(stored.clone());

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(correlation_id, stored);
    }

    #[tokio::test]
    async fn test_context_carries_authorization_verbatim() {
        let req = axum::http::Request::builder()
            .header("Authorization", "Bearer token-123")
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let Context(ctx) = Context::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(ctx.authorization(), Some("Bearer token-123"));
    }

    #[tokio::test]
    async fn test_anonymous_context() {
        let req = axum::http::Request::builder().body(()).expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let Context(ctx) = Context::from_request_parts(&mut parts, &()).await.unwrap();

        assert!(ctx.authorization().is_none());
        assert!(Uuid::parse_str(ctx.correlation_id()).is_ok());
    }

    #[tokio::test]
    async fn test_bad_query_is_400() {
        let req = axum::http::Request::builder()
            .uri("/composites/?breeder_limit=many")
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let err = ApiQuery::<CompositeFilter>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
