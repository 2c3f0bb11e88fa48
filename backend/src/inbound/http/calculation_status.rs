//! Polling endpoint for a field's recomputation status.
//!
//! Clients poll after a mutation until the status leaves `queued` or
//! `processing`. Unknown fields read as `none`.

use actix_web::{get, web};
use serde::Serialize;

use super::state::HttpState;
use super::{ApiResult, parse_id};
use crate::domain::{FieldId, JobStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationStatusResponse {
    pub field_id: FieldId,
    pub status: JobStatus,
}

#[get("/fields/{field_id}/calculation-status")]
pub async fn get_calculation_status(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<CalculationStatusResponse>> {
    let field_id: FieldId = parse_id(&path, "fieldId")?;
    let status = state.calculations.status(&field_id).await?;
    Ok(web::Json(CalculationStatusResponse { field_id, status }))
}
