//! Per-request access log.

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::correlation::RequestId;

/// Log every request with its correlation id. Runs inside
/// `assign_request_id` so the id is already in the extensions.
pub async fn log_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;

    if path == "/health" {
        tracing::trace!(request_id, %method, path, status, latency_ms, "Health check");
    } else if response.status().is_server_error() {
        tracing::error!(request_id, %method, path, status, latency_ms, "Request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(request_id, %method, path, status, latency_ms, "Request rejected");
    } else {
        tracing::info!(request_id, %method, path, status, latency_ms, "Request handled");
    }

    response
}
