//! Applied irrigation endpoints.

use actix_web::{HttpResponse, delete, post, put, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::state::HttpState;
use super::{ApiResult, parse_id};
use crate::domain::{
    AppliedIrrigation, FieldId, IrrigationId, IrrigationMeasurement, IrrigationUpdate,
    ManualIrrigation,
};

/// Timestamp plus a `kind`-tagged measurement.
#[derive(Debug, Deserialize)]
pub struct IrrigationPayload {
    pub timestamp: DateTime<Utc>,
    pub measurement: IrrigationMeasurement,
}

#[post("/fields/{field_id}/irrigations")]
pub async fn create_irrigation(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<IrrigationPayload>,
) -> ApiResult<HttpResponse> {
    let field_id: FieldId = parse_id(&path, "fieldId")?;
    let IrrigationPayload {
        timestamp,
        measurement,
    } = payload.into_inner();
    let stored = state
        .irrigations
        .record(ManualIrrigation {
            field_id,
            timestamp,
            measurement,
        })
        .await?;
    Ok(HttpResponse::Created().json(stored))
}

#[put("/irrigations/{irrigation_id}")]
pub async fn update_irrigation(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<IrrigationPayload>,
) -> ApiResult<web::Json<AppliedIrrigation>> {
    let id: IrrigationId = parse_id(&path, "irrigationId")?;
    let IrrigationPayload {
        timestamp,
        measurement,
    } = payload.into_inner();
    let updated = state
        .irrigations
        .update(
            &id,
            IrrigationUpdate {
                timestamp,
                measurement,
            },
        )
        .await?;
    Ok(web::Json(updated))
}

#[delete("/irrigations/{irrigation_id}")]
pub async fn delete_irrigation(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<AppliedIrrigation>> {
    let id: IrrigationId = parse_id(&path, "irrigationId")?;
    Ok(web::Json(state.irrigations.delete(&id).await?))
}
