//! DTOs for decoding telemetry network payloads.
//!
//! The payload is a JSON array of uplink summaries, decoded entry by entry.
//! Entries without a device id or timestamp cannot be attributed and are
//! dropped here; entries without a frequency are passed on so the domain can
//! count them.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::TelemetryReading;

#[derive(Debug, Deserialize)]
pub(super) struct UplinkDto {
    #[serde(rename = "SensorFrequency")]
    pub(super) sensor_frequency: Option<f64>,
    pub(super) time: Option<DateTime<Utc>>,
    pub(super) device_id: Option<String>,
}

impl UplinkDto {
    pub(super) fn into_reading(self) -> Option<TelemetryReading> {
        Some(TelemetryReading {
            device_id: self.device_id.filter(|id| !id.is_empty())?,
            sensor_frequency: self.sensor_frequency,
            timestamp: self.time?,
        })
    }
}
