//! Domain ports: the traits outbound adapters implement.

mod macros;
pub(crate) use macros::define_port_error;

mod calculation_queue;
mod calculation_results_store;
mod coverage;
mod device_config_repository;
mod digest_sender;
mod field_repository;
mod irrigation_repository;
mod job_status_store;
mod notification_directory;
mod soil_water_model;
mod telemetry_source;
mod user_repository;

#[cfg(test)]
pub use calculation_queue::MockCalculationQueue;
pub use calculation_queue::{CalculationQueue, JobDispatchError};
#[cfg(test)]
pub use calculation_results_store::MockCalculationResultsStore;
pub use calculation_results_store::{CalculationResultsStore, CalculationResultsStoreError};
pub use coverage::CoverageMap;
#[cfg(test)]
pub use coverage::MockCoverageMap;
#[cfg(test)]
pub use device_config_repository::MockDeviceConfigRepository;
pub use device_config_repository::{DeviceConfigRepository, DeviceConfigRepositoryError};
#[cfg(test)]
pub use digest_sender::MockDigestSender;
pub use digest_sender::{DigestSender, DigestSenderError};
#[cfg(test)]
pub use field_repository::MockFieldRepository;
pub use field_repository::{FieldRepository, FieldRepositoryError};
#[cfg(test)]
pub use irrigation_repository::MockIrrigationRepository;
pub use irrigation_repository::{IrrigationRepository, IrrigationRepositoryError};
#[cfg(test)]
pub use job_status_store::MockJobStatusStore;
pub use job_status_store::{JobStatusStore, JobStatusStoreError};
#[cfg(test)]
pub use notification_directory::MockNotificationDirectory;
pub use notification_directory::{NotificationDirectory, NotificationDirectoryError};
#[cfg(test)]
pub use soil_water_model::MockSoilWaterModel;
pub use soil_water_model::{FixtureSoilWaterModel, SoilWaterModel, SoilWaterModelError};
#[cfg(test)]
pub use telemetry_source::MockTelemetrySource;
pub use telemetry_source::{TelemetrySource, TelemetrySourceError};
#[cfg(test)]
pub use user_repository::{MockProfileRepository, MockUserRepository};
pub use user_repository::{ProfileRepository, UserRepository, UserRepositoryError};
