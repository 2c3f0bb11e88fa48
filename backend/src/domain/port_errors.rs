//! Conversions from port errors into domain errors.
//!
//! Connectivity failures become `ServiceUnavailable`; anything the caller
//! caused becomes `InvalidRequest` or `Conflict`; the rest is internal.

use serde_json::json;

use super::DomainError;
use super::ports::{
    CalculationResultsStoreError, DeviceConfigRepositoryError, DigestSenderError,
    FieldRepositoryError, IrrigationRepositoryError, JobDispatchError, JobStatusStoreError,
    NotificationDirectoryError, SoilWaterModelError, TelemetrySourceError, UserRepositoryError,
};

impl From<JobStatusStoreError> for DomainError {
    fn from(error: JobStatusStoreError) -> Self {
        match error {
            JobStatusStoreError::Connection { message } => {
                DomainError::service_unavailable(format!("job status store unavailable: {message}"))
            }
            JobStatusStoreError::Corrupt { message } => {
                DomainError::internal(format!("job status store error: {message}"))
            }
        }
    }
}

impl From<JobDispatchError> for DomainError {
    fn from(error: JobDispatchError) -> Self {
        match error {
            JobDispatchError::Unavailable { message } => {
                DomainError::service_unavailable(format!(
                    "calculation queue unavailable: {message}"
                ))
            }
            JobDispatchError::Rejected { message } => {
                DomainError::internal(format!("calculation job rejected: {message}"))
            }
        }
    }
}

impl From<CalculationResultsStoreError> for DomainError {
    fn from(error: CalculationResultsStoreError) -> Self {
        match error {
            CalculationResultsStoreError::Connection { message } => {
                DomainError::service_unavailable(format!("results store unavailable: {message}"))
            }
            CalculationResultsStoreError::Serialization { message } => {
                DomainError::internal(format!("results store error: {message}"))
            }
        }
    }
}

impl From<SoilWaterModelError> for DomainError {
    fn from(error: SoilWaterModelError) -> Self {
        match error {
            SoilWaterModelError::Unavailable { message } => {
                DomainError::service_unavailable(format!("soil water model unavailable: {message}"))
            }
            other => DomainError::internal(other.to_string()),
        }
    }
}

impl From<FieldRepositoryError> for DomainError {
    fn from(error: FieldRepositoryError) -> Self {
        match error {
            FieldRepositoryError::Connection { message } => {
                DomainError::service_unavailable(format!("field repository unavailable: {message}"))
            }
            FieldRepositoryError::Query { message } => {
                DomainError::internal(format!("field repository error: {message}"))
            }
            FieldRepositoryError::MissingReference { message } => {
                DomainError::invalid_request(format!(
                    "field references a missing record: {message}"
                ))
            }
        }
    }
}

impl From<IrrigationRepositoryError> for DomainError {
    fn from(error: IrrigationRepositoryError) -> Self {
        match error {
            IrrigationRepositoryError::Connection { message } => {
                DomainError::service_unavailable(format!(
                    "irrigation repository unavailable: {message}"
                ))
            }
            IrrigationRepositoryError::Query { message } => {
                DomainError::internal(format!("irrigation repository error: {message}"))
            }
            IrrigationRepositoryError::Duplicate { message } => {
                DomainError::invalid_request(
                    "an irrigation is already recorded for this field at that time",
                )
                .with_details(json!({ "code": "duplicate_irrigation", "reason": message }))
            }
        }
    }
}

impl From<DeviceConfigRepositoryError> for DomainError {
    fn from(error: DeviceConfigRepositoryError) -> Self {
        match error {
            DeviceConfigRepositoryError::Connection { message } => {
                DomainError::service_unavailable(format!(
                    "device repository unavailable: {message}"
                ))
            }
            DeviceConfigRepositoryError::Query { message } => {
                DomainError::internal(format!("device repository error: {message}"))
            }
            DeviceConfigRepositoryError::DeviceInUse { device_id } => {
                DomainError::conflict("device is already registered")
                    .with_details(json!({ "deviceId": device_id, "code": "device_in_use" }))
            }
        }
    }
}

impl From<TelemetrySourceError> for DomainError {
    fn from(error: TelemetrySourceError) -> Self {
        DomainError::service_unavailable(error.to_string())
    }
}

impl From<NotificationDirectoryError> for DomainError {
    fn from(error: NotificationDirectoryError) -> Self {
        match error {
            NotificationDirectoryError::Connection { message } => {
                DomainError::service_unavailable(format!(
                    "notification directory unavailable: {message}"
                ))
            }
            NotificationDirectoryError::Query { message } => {
                DomainError::internal(format!("notification directory error: {message}"))
            }
        }
    }
}

impl From<DigestSenderError> for DomainError {
    fn from(error: DigestSenderError) -> Self {
        DomainError::service_unavailable(error.to_string())
    }
}

impl From<UserRepositoryError> for DomainError {
    fn from(error: UserRepositoryError) -> Self {
        match error {
            UserRepositoryError::Connection { message } => {
                DomainError::service_unavailable(format!("user repository unavailable: {message}"))
            }
            UserRepositoryError::Query { message } => {
                DomainError::internal(format!("user repository error: {message}"))
            }
            UserRepositoryError::Duplicate { message } => DomainError::conflict(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(JobStatusStoreError::connection("down").into(), ErrorCode::ServiceUnavailable)]
    #[case(FieldRepositoryError::query("syntax").into(), ErrorCode::InternalError)]
    #[case(
        IrrigationRepositoryError::duplicate("unique violation").into(),
        ErrorCode::InvalidRequest
    )]
    #[case(DeviceConfigRepositoryError::device_in_use("arta-1").into(), ErrorCode::Conflict)]
    #[case(TelemetrySourceError::timeout("30s").into(), ErrorCode::ServiceUnavailable)]
    #[case(SoilWaterModelError::execution("nan").into(), ErrorCode::InternalError)]
    fn maps_port_errors_to_codes(#[case] error: DomainError, #[case] code: ErrorCode) {
        assert_eq!(error.code(), code);
    }
}
