//! Attaching and detaching telemetric devices.
//!
//! A field has at most one device. Registering replaces whatever the field
//! had, of any kind. Detaching also drops the automatic records the device
//! produced, since they no longer have a source the owner can vouch for.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::ports::{DeviceConfigRepository, FieldRepository, IrrigationRepository};
use crate::domain::{CalculationDispatcher, DomainError, Field, FieldId, TelemetricDeviceConfig};

/// Result of detaching a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRemoval {
    pub removed_config: bool,
    pub removed_records: usize,
}

#[derive(Clone)]
pub struct DeviceRegistrationService {
    fields: Arc<dyn FieldRepository>,
    devices: Arc<dyn DeviceConfigRepository>,
    irrigations: Arc<dyn IrrigationRepository>,
    dispatcher: CalculationDispatcher,
}

impl DeviceRegistrationService {
    pub fn new(
        fields: Arc<dyn FieldRepository>,
        devices: Arc<dyn DeviceConfigRepository>,
        irrigations: Arc<dyn IrrigationRepository>,
        dispatcher: CalculationDispatcher,
    ) -> Self {
        Self {
            fields,
            devices,
            irrigations,
            dispatcher,
        }
    }

    async fn field(&self, field_id: &FieldId) -> Result<Field, DomainError> {
        self.fields.find_by_id(field_id).await?.ok_or_else(|| {
            DomainError::not_found("field not found").with_details(json!({ "fieldId": field_id }))
        })
    }

    pub async fn register(&self, config: TelemetricDeviceConfig) -> Result<(), DomainError> {
        config.validate()?;
        let field = self.field(&config.field_id).await?;
        self.devices.replace_for_field(&config).await?;
        info!(
            field_id = %field.id,
            device_id = %config.device_id,
            device_kind = %config.kind(),
            "telemetric device registered"
        );
        self.dispatcher.request_recompute_for(&field).await?;
        Ok(())
    }

    pub async fn remove(&self, field_id: &FieldId) -> Result<DeviceRemoval, DomainError> {
        let field = self.field(field_id).await?;
        let removed_config = self.devices.delete_for_field(field_id).await?;
        let removed_records = self.irrigations.delete_automatic_for_field(field_id).await?;
        info!(
            %field_id,
            removed_config,
            removed_records,
            "telemetric device removed"
        );
        if removed_config || removed_records > 0 {
            self.dispatcher.request_recompute_for(&field).await?;
        }
        Ok(DeviceRemoval {
            removed_config,
            removed_records,
        })
    }
}
