//! Irrigation accounting domain.
//!
//! Purpose: hold the entities, pure calculations and use-case services of
//! the irrigation subsystem. Services talk to the outside world only through
//! the traits in [`ports`]; adapters live in `crate::outbound`.
//!
//! Public surface:
//! - DomainError / ErrorCode: transport-agnostic failure with a stable code.
//! - Field, AppliedIrrigation, TelemetricDeviceConfig, Profile: entities.
//! - resolve_volume, Cadence::is_due: pure rules.
//! - CalculationDispatcher, CalculationWorker, TelemetryIngestionService,
//!   NotificationService and the mutation services: use cases.

pub mod calculation;
pub mod calculation_dispatcher;
pub mod calculation_worker;
pub mod device_registration;
pub mod error;
pub mod field;
pub mod field_service;
pub mod ids;
pub mod irrigation;
pub mod irrigation_defaults;
pub mod irrigation_service;
pub mod job_status;
pub mod notifications;
mod port_errors;
pub mod ports;
pub mod profile;
pub mod telemetry;
pub mod telemetry_ingestion;
pub mod user_onboarding;

pub use self::calculation::{
    CalculationResults, DailyRecommendation, EffectiveParameters, IrrigationEvent,
    SimulationInput,
};
pub use self::calculation_dispatcher::{CalculationDispatcher, DispatchOutcome};
pub use self::calculation_worker::{CalculationWorker, CalculationWorkerPorts, JobOutcome};
pub use self::device_registration::{DeviceRegistrationService, DeviceRemoval};
pub use self::error::{DomainError, ErrorCode, DomainErrorValidationError};
pub use self::field::{
    Coordinates, CropType, CustomParameters, DEFAULT_IRRIGATION_OPTIMIZER, Field, IrrigationType,
    SoilProfile,
};
pub use self::field_service::FieldService;
pub use self::ids::{FieldId, IdParseError, IrrigationId, UserId};
pub use self::irrigation::{
    AppliedIrrigation, AutomaticIrrigation, IrrigationKind, IrrigationMeasurement,
    ManualIrrigation, UnknownIrrigationKind, resolve_volume, system_default_volume,
};
pub use self::irrigation_defaults::{
    DurationDefaults, FlowmeterDefaults, IrrigationDefaults, IrrigationDefaultsService,
};
pub use self::irrigation_service::{IrrigationService, IrrigationUpdate};
pub use self::job_status::{JobStatus, UnknownJobStatus};
pub use self::notifications::{
    Cadence, FieldDigest, IrrigationDigest, NotificationRunReport, NotificationService,
    UnknownCadence,
};
pub use self::profile::{EmailLanguage, Profile, Recipient, UnknownEmailLanguage, User};
pub use self::telemetry::{
    InvalidLookback, LORA_ARTA_DEFAULT_CONVERSION_RATE, LORA_ARTA_DEFAULT_REPORT_FREQUENCY_MINUTES,
    LoraArtaSettings, Lookback, TelemetricDevice, TelemetricDeviceConfig, TelemetricDeviceKind,
    TelemetryReading, UnknownDeviceKind,
};
pub use self::telemetry_ingestion::{IngestionReport, TelemetryIngestionService};
pub use self::user_onboarding::UserOnboardingService;

/// Convenient result alias for use cases and handlers.
///
/// # Examples
/// ```
/// use irrigation_backend::domain::{ApiResult, DomainError};
///
/// fn lookup() -> ApiResult<()> {
///     Err(DomainError::not_found("field not found"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type ApiResult<T> = Result<T, DomainError>;
