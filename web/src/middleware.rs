//! Request tracking middleware.
//!
//! Every request gets a request id (taken from `X-Request-ID` when the client
//! sends a valid UUID, generated otherwise), runs inside an `http_request`
//! span carrying that id, and is counted in `seat_http_requests_total` and
//! `seat_http_request_duration_seconds`. The id is echoed in the response.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/holds", post(place_hold))
//!     .layer(axum::middleware::from_fn(track_requests));
//! ```

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Header name for the request id.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Request id assigned by [`track_requests`], stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

/// Assign a request id, trace the request and record HTTP metrics.
pub async fn track_requests(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    req.extensions_mut().insert(RequestId(request_id));

    let method = req.method().to_string();
    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        uri = %req.uri(),
    );

    let started = Instant::now();
    let mut response = next.run(req).instrument(span).await;
    let status = response.status().as_u16().to_string();

    metrics::counter!("seat_http_requests_total", "method" => method.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("seat_http_request_duration_seconds", "method" => method)
        .record(started.elapsed().as_secs_f64());

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
