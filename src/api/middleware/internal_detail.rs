//! Development-only internal error detail.

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_LENGTH;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::error::InternalErrorDetail;
use crate::api::types::{ApiContext, Envelope, ResponseCode};

/// Replace the generic 500 message with the recorded detail when the
/// configured environment allows it. The detail never leaves the process
/// otherwise.
pub async fn expose_internal_detail(
    State(ctx): State<ApiContext>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let Some(InternalErrorDetail(detail)) = response.extensions_mut().remove::<InternalErrorDetail>()
    else {
        return response;
    };
    if !ctx.exposes_internal_errors() {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    let body = Json(Envelope::failure(ResponseCode::InternalServerError, detail))
        .into_response()
        .into_body();
    Response::from_parts(parts, body)
}
