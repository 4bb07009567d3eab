//! Pub/sub push endpoint for lab-result messages.
//!
//! The push envelope wraps the same `{appointmentID, action}` payload the
//! HTTP endpoint takes, base64-encoded in `message.data`.

use std::collections::HashMap;

use axum::extract::State;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiResult, Envelope};
use crate::lifecycle::{BatchEntry, LabPayload, ProcessedResult};

#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub data: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub publish_time: Option<String>,
}

/// Decode `message.data` into a result entry.
pub fn decode_message(message: &PushMessage) -> Result<BatchEntry, ApiError> {
    let raw = STANDARD
        .decode(message.data.trim())
        .map_err(|e| ApiError::Validation(format!("message.data is not valid base64: {e}")))?;
    serde_json::from_slice(&raw)
        .map_err(|e| ApiError::Validation(format!("message.data is not a valid payload: {e}")))
}

/// `POST /pubsub/test-results`
pub async fn test_results(
    State(ctx): State<ApiContext>,
    ApiJson(push): ApiJson<PushEnvelope>,
) -> ApiResult<ProcessedResult> {
    let entry = decode_message(&push.message)?;
    tracing::debug!(
        message_id = push.message.message_id.as_deref().unwrap_or(""),
        subscription = push.subscription.as_deref().unwrap_or(""),
        appointment_id = %entry.appointment_id,
        "Lab result pushed"
    );

    let processed = ctx.core.results.process_result(
        &entry.appointment_id,
        &LabPayload {
            action: entry.action,
        },
    )?;
    Ok(Envelope::success(processed))
}
