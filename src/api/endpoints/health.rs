//! Health check endpoint.

use axum::extract::State;
use serde::Serialize;

use crate::api::types::{ApiContext, ApiResult, Envelope};
use crate::models::AppointmentFilter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub store_ok: bool,
}

/// `GET /health`: liveness plus a cheap store check.
pub async fn check(State(ctx): State<ApiContext>) -> ApiResult<HealthResponse> {
    let sample = AppointmentFilter {
        organization_id: Some(String::new()),
        ..Default::default()
    };
    let store_ok = match ctx.core.store.list(&sample) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store unavailable");
            false
        }
    };

    Ok(Envelope::success(HealthResponse {
        status: if store_ok { "ok" } else { "degraded" },
        service: crate::config::APP_NAME,
        version: crate::config::APP_VERSION,
        store_ok,
    }))
}
