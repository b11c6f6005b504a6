//! Request ID middleware for HTTP request correlation
//!
//! Takes the client's `X-Request-Id` when it is a UUID, otherwise mints a
//! time-ordered one. The id scopes the scratch directory and every log line
//! of the orchestration run.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{body::Body, extract::Request, http::header::HeaderValue, response::Response};
use domain::RequestId;
use tower::{Layer, Service};
use tracing::Instrument;

/// The header name for the request ID
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Layer that adds request ID handling to HTTP services
#[derive(Debug, Clone, Default)]
pub struct RequestIdLayer;

impl RequestIdLayer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Service that extracts or generates a request ID for each request
#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

/// Parse a client-supplied id; anything that is not a UUID is ignored
pub fn request_id_from_header(value: Option<&HeaderValue>) -> RequestId {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| RequestId::parse(s.trim()).ok())
        .unwrap_or_default()
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let request_id = request_id_from_header(request.headers().get(REQUEST_ID_HEADER));
        request.extensions_mut().insert(request_id);

        let span = tracing::info_span!(
            "http_request",
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri().path(),
        );

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let mut response = inner.call(request).await?;

                if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn request_id_layer_is_zero_sized() {
        let layer = RequestIdLayer::new();
        assert_eq!(std::mem::size_of_val(&layer), 0);
    }

    #[test]
    fn valid_header_is_kept() {
        let uuid = Uuid::now_v7();
        let header = HeaderValue::from_str(&uuid.to_string()).unwrap();
        assert_eq!(request_id_from_header(Some(&header)).as_uuid(), uuid);
    }

    #[test]
    fn garbage_header_gets_fresh_id() {
        let header = HeaderValue::from_static("../../etc");
        let id = request_id_from_header(Some(&header));
        assert_eq!(id.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn missing_header_gets_fresh_id() {
        assert_ne!(request_id_from_header(None), request_id_from_header(None));
    }
}
