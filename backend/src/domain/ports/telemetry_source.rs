//! Port for pulling readings from a telemetry network.
use async_trait::async_trait;

use crate::domain::{Lookback, TelemetricDeviceKind, TelemetryReading};

use super::define_port_error;

define_port_error! {
    /// Errors raised by telemetry source adapters.
    pub enum TelemetrySourceError {
        /// The request could not be completed or returned a failure status.
        Transport { message: String } => "telemetry transport failed: {message}",
        /// The request exceeded its deadline.
        Timeout { message: String } => "telemetry request timed out: {message}",
    }
}

/// Source of readings for one device kind.
///
/// An unparseable response body yields an empty list, not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Device kind whose registrations the readings resolve against.
    fn device_kind(&self) -> TelemetricDeviceKind;

    async fn fetch_readings(
        &self,
        lookback: &Lookback,
    ) -> Result<Vec<TelemetryReading>, TelemetrySourceError>;
}
