//! Port for telemetric device registrations.
use async_trait::async_trait;

use crate::domain::{FieldId, TelemetricDeviceConfig, TelemetricDeviceKind};

use super::define_port_error;

define_port_error! {
    /// Errors raised by device configuration repository adapters.
    pub enum DeviceConfigRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "device repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "device repository query failed: {message}",
        /// The device id is already registered to another field.
        DeviceInUse { device_id: String } => "device {device_id} is already registered",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceConfigRepository: Send + Sync {
    async fn find_by_device_id(
        &self,
        kind: TelemetricDeviceKind,
        device_id: &str,
    ) -> Result<Option<TelemetricDeviceConfig>, DeviceConfigRepositoryError>;

    async fn find_by_field(
        &self,
        field_id: &FieldId,
    ) -> Result<Option<TelemetricDeviceConfig>, DeviceConfigRepositoryError>;

    /// Remove every registration of the field, of any kind, then store
    /// `config`, in one transaction.
    async fn replace_for_field(
        &self,
        config: &TelemetricDeviceConfig,
    ) -> Result<(), DeviceConfigRepositoryError>;

    /// Remove every registration of the field. Returns `false` if there was
    /// none.
    async fn delete_for_field(&self, field_id: &FieldId)
    -> Result<bool, DeviceConfigRepositoryError>;
}
