//! HTTP router.
//!
//! Routes come from one explicit table (path → method router) so the
//! full surface is visible in one place.
//!
//! Middleware stack (outermost → innermost):
//! 1. `Cache-Control: no-store` → 2. Correlation id → 3. Request log →
//! 4. Internal error detail

use std::sync::Arc;

use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put, MethodRouter};
use axum::{Json, Router};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::{ApiContext, Envelope, ResponseCode};
use crate::core_state::CoreState;

/// Every route the service exposes.
pub fn route_table() -> Vec<(&'static str, MethodRouter<ApiContext>)> {
    vec![
        ("/health", get(endpoints::health::check)),
        (
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        ),
        ("/appointments/:id", get(endpoints::appointments::detail)),
        (
            "/appointments/:id/status",
            put(endpoints::appointments::update_status),
        ),
        (
            "/appointments/:id/check-in",
            post(endpoints::appointments::check_in),
        ),
        (
            "/appointments/:id/barcode",
            post(endpoints::appointments::regenerate_barcode),
        ),
        ("/barcodes/:code", get(endpoints::appointments::by_barcode)),
        ("/results", post(endpoints::results::process)),
        ("/results/bulk", post(endpoints::results::process_bulk)),
        (
            "/organizations/:id/report",
            get(endpoints::reports::organization),
        ),
        ("/pubsub/test-results", post(endpoints::pubsub::test_results)),
    ]
}

/// Build the service router over shared state.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    let routes = route_table()
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(path, method_router.fallback(method_not_allowed))
        });

    // Layers are applied innermost first.
    routes
        .fallback(not_found)
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn_with_state(
            ctx,
            middleware::internal_detail::expose_internal_detail,
        ))
        .layer(axum::middleware::from_fn(middleware::request_log::log_request))
        .layer(axum::middleware::from_fn(
            middleware::correlation::assign_request_id,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(Envelope::failure(
            ResponseCode::Failed,
            "Method not allowed on this route",
        )),
    )
        .into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::failure(
            ResponseCode::ResourceNotFound,
            "No such route",
        )),
    )
        .into_response()
}
