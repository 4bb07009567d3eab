//! Lab-result endpoints.

use axum::extract::State;

use crate::api::types::{ApiContext, ApiJson, ApiResult, Envelope};
use crate::lifecycle::{BatchEntry, BatchItemResult, LabPayload, ProcessedResult};

/// `POST /results`: `{appointmentID, action}`
pub async fn process(
    State(ctx): State<ApiContext>,
    ApiJson(entry): ApiJson<BatchEntry>,
) -> ApiResult<ProcessedResult> {
    let processed = ctx.core.results.process_result(
        &entry.appointment_id,
        &LabPayload {
            action: entry.action,
        },
    )?;
    Ok(Envelope::success(processed))
}

/// `POST /results/bulk`: array of `{appointmentID, action}`; one result per
/// entry, in order.
pub async fn process_bulk(
    State(ctx): State<ApiContext>,
    ApiJson(entries): ApiJson<Vec<BatchEntry>>,
) -> ApiResult<Vec<BatchItemResult>> {
    Ok(Envelope::success(ctx.core.results.process_batch(&entries)?))
}
