use axum::extract::{Path, State};

use crate::api::types::{ApiContext, ApiResult, Envelope};
use crate::lifecycle::OrganizationReport;

/// `GET /organizations/:id/report`
pub async fn organization(
    State(ctx): State<ApiContext>,
    Path(organization_id): Path<String>,
) -> ApiResult<OrganizationReport> {
    let report = ctx.core.appointments.organization_report(&organization_id)?;
    Ok(Envelope::success(report))
}
