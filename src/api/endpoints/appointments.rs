//! Appointment endpoints: booking, lookup, admin transitions, check-in and
//! barcodes.

use axum::extract::{Path, State};
use serde::Deserialize;

use crate::api::types::{ApiContext, ApiJson, ApiJsonOrDefault, ApiQuery, ApiResult, Envelope};
use crate::lifecycle::TransitionRequest;
use crate::models::{Appointment, AppointmentFilter};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub organization_id: String,
    pub user_id: String,
}

/// `POST /appointments`
pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(req): ApiJson<CreateAppointmentRequest>,
) -> ApiResult<Appointment> {
    let appt = ctx
        .core
        .appointments
        .create_appointment(&req.organization_id, &req.user_id)?;
    Ok(Envelope::success(appt))
}

/// `GET /appointments?organizationId=&userId=&status=`
pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> ApiResult<Vec<Appointment>> {
    let appointments = ctx.core.appointments.list_appointments(&filter)?;
    Ok(Envelope::success(appointments))
}

/// `GET /appointments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Appointment> {
    Ok(Envelope::success(ctx.core.appointments.get_appointment(&id)?))
}

/// `PUT /appointments/:id/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TransitionRequest>,
) -> ApiResult<Appointment> {
    Ok(Envelope::success(ctx.core.appointments.transition(&id, &req)?))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[serde(default)]
    pub bar_code: Option<String>,
}

/// `POST /appointments/:id/check-in`; the body is optional.
pub async fn check_in(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    ApiJsonOrDefault(req): ApiJsonOrDefault<CheckInRequest>,
) -> ApiResult<Appointment> {
    let appt = ctx
        .core
        .appointments
        .check_in(&id, req.bar_code.as_deref())?;
    Ok(Envelope::success(appt))
}

/// `POST /appointments/:id/barcode`: issue a replacement barcode.
pub async fn regenerate_barcode(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Appointment> {
    Ok(Envelope::success(ctx.core.appointments.regenerate_barcode(&id)?))
}

/// `GET /barcodes/:code`
pub async fn by_barcode(
    State(ctx): State<ApiContext>,
    Path(code): Path<String>,
) -> ApiResult<Appointment> {
    Ok(Envelope::success(ctx.core.appointments.find_by_barcode(&code)?))
}
