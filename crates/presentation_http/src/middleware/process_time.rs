//! Adds `X-Process-Time` (seconds, as a decimal) to every response

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    response::Response,
};
use tower::{Layer, Service};

pub const PROCESS_TIME_HEADER: HeaderName = HeaderName::from_static("x-process-time");

#[derive(Debug, Clone, Default)]
pub struct ProcessTimeLayer;

impl ProcessTimeLayer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ProcessTimeLayer {
    type Service = ProcessTime<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProcessTime { inner }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessTime<S> {
    inner: S,
}

impl<S, ReqBody> Service<Request<ReqBody>> for ProcessTime<S>
where
    S: Service<Request<ReqBody>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let started = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            let elapsed = format!("{:.6}", started.elapsed().as_secs_f64());
            if let Ok(value) = HeaderValue::from_str(&elapsed) {
                response.headers_mut().insert(PROCESS_TIME_HEADER, value);
            }
            Ok(response)
        })
    }
}
