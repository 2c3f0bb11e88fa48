//! Applied irrigation records and volume resolution.
//!
//! A record is measured in exactly one of three modes. Each mode carries only
//! its own operands; operands are optional because historical rows may be
//! incomplete, and resolution must never fail on them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{DomainError, Field, FieldId, IrrigationId};

/// Measurement mode discriminator with its stable storage code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrrigationKind {
    #[serde(rename = "VOLUME_OF_WATER")]
    Volume,
    #[serde(rename = "DURATION_OF_IRRIGATION")]
    DurationFlow,
    #[serde(rename = "FLOWMETER_READINGS")]
    Flowmeter,
}

impl IrrigationKind {
    pub const ALL: [Self; 3] = [Self::Volume, Self::DurationFlow, Self::Flowmeter];

    pub fn code(self) -> &'static str {
        match self {
            Self::Volume => "VOLUME_OF_WATER",
            Self::DurationFlow => "DURATION_OF_IRRIGATION",
            Self::Flowmeter => "FLOWMETER_READINGS",
        }
    }
}

impl fmt::Display for IrrigationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned for an unknown irrigation kind code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown irrigation kind: {0}")]
pub struct UnknownIrrigationKind(pub String);

impl FromStr for IrrigationKind {
    type Err = UnknownIrrigationKind;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or_else(|| UnknownIrrigationKind(code.to_owned()))
    }
}

/// Mode-specific measurement payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum IrrigationMeasurement {
    /// Cubic metres supplied.
    #[serde(rename = "VOLUME_OF_WATER")]
    Volume { volume: Option<f64> },
    /// Minutes of irrigation at a flow rate in m³/h.
    #[serde(rename = "DURATION_OF_IRRIGATION")]
    DurationFlow {
        duration_minutes: Option<u32>,
        flow_rate: Option<f64>,
    },
    /// Meter readings; `water_percentage` is the share of the metered water
    /// that reached this field.
    #[serde(rename = "FLOWMETER_READINGS")]
    Flowmeter {
        reading_start: Option<f64>,
        reading_end: Option<f64>,
        water_percentage: Option<u8>,
    },
}

impl IrrigationMeasurement {
    pub fn kind(&self) -> IrrigationKind {
        match self {
            Self::Volume { .. } => IrrigationKind::Volume,
            Self::DurationFlow { .. } => IrrigationKind::DurationFlow,
            Self::Flowmeter { .. } => IrrigationKind::Flowmeter,
        }
    }

    /// Derived volume in cubic metres; see [`resolve_volume`].
    pub fn volume(&self) -> Option<f64> {
        resolve_volume(self)
    }
}

/// Derive the applied volume of a measurement.
///
/// Returns `None` whenever an operand of the measurement's mode is missing,
/// and for flowmeter readings with a zero water percentage.
///
/// # Examples
/// ```
/// use irrigation_backend::domain::{IrrigationMeasurement, resolve_volume};
///
/// let m = IrrigationMeasurement::DurationFlow {
///     duration_minutes: Some(90),
///     flow_rate: Some(2.0),
/// };
/// assert_eq!(resolve_volume(&m), Some(3.0));
/// ```
pub fn resolve_volume(measurement: &IrrigationMeasurement) -> Option<f64> {
    match *measurement {
        IrrigationMeasurement::Volume { volume } => volume,
        IrrigationMeasurement::DurationFlow {
            duration_minutes,
            flow_rate,
        } => Some(f64::from(duration_minutes?) / 60.0 * flow_rate?),
        IrrigationMeasurement::Flowmeter {
            reading_start,
            reading_end,
            water_percentage,
        } => {
            let percentage = water_percentage.filter(|p| *p != 0)?;
            Some((reading_end? - reading_start?) * (100.0 / f64::from(percentage)))
        }
    }
}

/// Fallback estimate for a field when a record carries no usable volume:
/// `p * (field_capacity - wilting_point) * root_depth * wetted_area`.
///
/// `None` when the field has no soil values, which is the case outside the
/// serviceable area unless the owner supplied overrides.
pub fn system_default_volume(field: &Field) -> Option<f64> {
    let available = field.field_capacity()? - field.wilting_point()?;
    Some(field.p() * available * field.root_depth() * field.wetted_area)
}

/// Persisted irrigation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedIrrigation {
    pub id: IrrigationId,
    pub field_id: FieldId,
    pub timestamp: DateTime<Utc>,
    pub measurement: IrrigationMeasurement,
    /// Added by a telemetric device rather than by the owner.
    pub is_automatic: bool,
}

impl AppliedIrrigation {
    pub fn kind(&self) -> IrrigationKind {
        self.measurement.kind()
    }

    pub fn volume(&self) -> Option<f64> {
        self.measurement.volume()
    }
}

/// Owner-entered irrigation awaiting validation and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualIrrigation {
    pub field_id: FieldId,
    pub timestamp: DateTime<Utc>,
    pub measurement: IrrigationMeasurement,
}

impl IrrigationMeasurement {
    /// Check that every operand of the mode is present and in range.
    ///
    /// Stored records may be incomplete; only owner input goes through
    /// this check.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();
        let mut non_negative = |name: &'static str, value: Option<f64>| match value {
            None => missing.push(name),
            Some(v) if !v.is_finite() || v < 0.0 => invalid.push(name),
            Some(_) => {}
        };

        match *self {
            IrrigationMeasurement::Volume { volume } => non_negative("volume", volume),
            IrrigationMeasurement::DurationFlow {
                duration_minutes,
                flow_rate,
            } => {
                non_negative("durationMinutes", duration_minutes.map(f64::from));
                non_negative("flowRate", flow_rate);
            }
            IrrigationMeasurement::Flowmeter {
                reading_start,
                reading_end,
                water_percentage,
            } => {
                non_negative("readingStart", reading_start);
                non_negative("readingEnd", reading_end);
                match water_percentage {
                    None => missing.push("waterPercentage"),
                    Some(1..=100) => {}
                    Some(_) => invalid.push("waterPercentage"),
                }
            }
        }

        if missing.is_empty() && invalid.is_empty() {
            return Ok(());
        }
        Err(DomainError::invalid_request("irrigation record is incomplete or out of range")
            .with_details(json!({
                "kind": self.kind().code(),
                "missing": missing,
                "invalid": invalid,
            })))
    }
}

impl ManualIrrigation {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.measurement.validate()
    }
}

/// Volume record reported by a telemetric device.
///
/// `(field_id, timestamp, volume)` is unique among automatic records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomaticIrrigation {
    pub field_id: FieldId,
    pub timestamp: DateTime<Utc>,
    pub volume: f64,
}

impl AutomaticIrrigation {
    /// Identity used for deduplication; volumes compare bitwise.
    pub fn identity(&self) -> (FieldId, DateTime<Utc>, u64) {
        (self.field_id, self.timestamp, self.volume.to_bits())
    }
}
