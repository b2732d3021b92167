//! Request tagging.
//!
//! Every request passing through [`correlation_id_layer`] carries one id from
//! the edge to the response. A caller-supplied `X-Correlation-ID` is kept when
//! it parses as a UUID; anything else is replaced by a fresh v4 id. Handlers
//! read it with the [`CorrelationId`] extractor, log lines inside the handler
//! inherit it from the `http_request` span, and the response repeats it so a
//! client can quote it back.
//!
//! ```
//! use axum::{Router, routing::get};
//! use car_rental_web::middleware::correlation_id_layer;
//!
//! let app: Router = Router::new()
//!     .route("/health", get(|| async { "ok" }))
//!     .layer(correlation_id_layer());
//! ```

use crate::extractors::CorrelationId;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    response::Response,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{Instrument, Span};
use uuid::Uuid;

/// Header that carries the correlation id in both directions.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

type Pending<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send>>;

/// Tag every request routed through the returned layer.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationLayer {
    CorrelationLayer
}

/// Wraps a service in [`Correlated`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationLayer;

impl<S> Layer<S> for CorrelationLayer {
    type Service = Correlated<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Correlated { inner }
    }
}

/// Service that assigns the id, runs the inner service in its span and
/// stamps the id on the way out.
#[derive(Clone, Debug)]
pub struct Correlated<S> {
    inner: S,
}

/// Id the caller sent, if it is a UUID.
fn incoming_id(headers: &HeaderMap) -> Option<Uuid> {
    let raw = headers.get(CORRELATION_ID_HEADER)?.to_str().ok()?;
    Uuid::parse_str(raw.trim()).ok()
}

fn request_span(id: Uuid, request: &Request) -> Span {
    tracing::info_span!(
        "http_request",
        correlation_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}

impl<S> Service<Request> for Correlated<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pending<Response, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let id = incoming_id(request.headers()).unwrap_or_else(Uuid::new_v4);
        let span = request_span(id, &request);
        request.extensions_mut().insert(CorrelationId(id));

        let handled = self.inner.call(request).instrument(span);
        Box::pin(async move {
            let mut response = handled.await?;
            // A hyphenated UUID is always a valid header value.
            if let Ok(value) = HeaderValue::try_from(id.hyphenated().to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}
