//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the caller sent none
//! - Expose the ID to handlers so it can travel to the order engine
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A caller-supplied `x-request-id` is kept as is

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderName, HeaderValue, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId as HeaderRequestId};
use uuid::Uuid;

/// Header carrying the request ID in and out of the gateway.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<HeaderRequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(HeaderRequestId::new)
    }
}

/// The current request's ID, as a handler argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read the ID set by `SetRequestIdLayer`, falling back to the raw header.
pub fn request_id_of(parts: &Parts) -> Option<String> {
    let value = parts
        .extensions
        .get::<HeaderRequestId>()
        .map(HeaderRequestId::header_value)
        .or_else(|| parts.headers.get(X_REQUEST_ID))?;
    value.to_str().ok().map(str::to_string)
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = request_id_of(parts).unwrap_or_else(|| "unknown".to_string());
        Ok(RequestId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_uuids() {
        let request = Request::new(());
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }

    #[tokio::test]
    async fn extractor_prefers_extension() {
        let mut request = Request::builder()
            .header(X_REQUEST_ID, "from-header")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(HeaderRequestId::new(HeaderValue::from_static("from-layer")));
        let (mut parts, _) = request.into_parts();

        let id = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.as_str(), "from-layer");
    }

    #[tokio::test]
    async fn extractor_falls_back_to_header() {
        let request = Request::builder()
            .header(X_REQUEST_ID, "abc-123")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let id = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.to_string(), "abc-123");
    }
}
