//! Field endpoints: save a field, read irrigation defaults, register or
//! remove the field's telemetric device.

use actix_web::{HttpResponse, delete, get, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::state::HttpState;
use super::{ApiResult, parse_id};
use crate::domain::{
    DispatchOutcome, DomainError, Field, FieldId, IrrigationDefaults, TelemetricDevice,
    TelemetricDeviceConfig,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFieldResponse {
    pub field: Field,
    /// `submitted`, `already_queued` or `not_serviceable`.
    pub dispatch: &'static str,
}

fn dispatch_code(outcome: DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::Submitted => "submitted",
        DispatchOutcome::AlreadyQueued => "already_queued",
        DispatchOutcome::NotServiceable => "not_serviceable",
    }
}

#[put("/fields/{field_id}")]
pub async fn put_field(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<Field>,
) -> ApiResult<web::Json<SavedFieldResponse>> {
    let field_id: FieldId = parse_id(&path, "fieldId")?;
    let field = payload.into_inner();
    if field.id != field_id {
        return Err(DomainError::invalid_request("field id does not match the path")
            .with_details(json!({ "fieldId": field_id, "bodyId": field.id })));
    }
    let (field, outcome) = state.fields.save_field(field).await?;
    Ok(web::Json(SavedFieldResponse {
        field,
        dispatch: dispatch_code(outcome),
    }))
}

#[get("/fields/{field_id}/irrigation-defaults")]
pub async fn get_irrigation_defaults(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<IrrigationDefaults>> {
    let field_id: FieldId = parse_id(&path, "fieldId")?;
    Ok(web::Json(state.defaults.get_defaults(&field_id).await?))
}

/// Device registration body; the field comes from the path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationRequest {
    pub device_id: String,
    pub water_percentage: u8,
    pub device: TelemetricDevice,
}

#[put("/fields/{field_id}/telemetric-device")]
pub async fn put_telemetric_device(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<DeviceRegistrationRequest>,
) -> ApiResult<HttpResponse> {
    let field_id: FieldId = parse_id(&path, "fieldId")?;
    let DeviceRegistrationRequest {
        device_id,
        water_percentage,
        device,
    } = payload.into_inner();
    state
        .devices
        .register(TelemetricDeviceConfig {
            field_id,
            device_id,
            water_percentage,
            device,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRemovalResponse {
    pub removed_config: bool,
    pub removed_records: usize,
}

#[delete("/fields/{field_id}/telemetric-device")]
pub async fn delete_telemetric_device(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<DeviceRemovalResponse>> {
    let field_id: FieldId = parse_id(&path, "fieldId")?;
    let removal = state.devices.remove(&field_id).await?;
    Ok(web::Json(DeviceRemovalResponse {
        removed_config: removal.removed_config,
        removed_records: removal.removed_records,
    }))
}
