//! Telemetric flow sensors and the readings they report.
//!
//! Device types form a closed set. Each variant of [`TelemetricDevice`]
//! carries its own settings and its own volume conversion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{DomainError, FieldId};

/// Default LoRA-ARTA pulse-to-volume conversion rate.
pub const LORA_ARTA_DEFAULT_CONVERSION_RATE: f64 = 6.8;
/// Default LoRA-ARTA reporting interval.
pub const LORA_ARTA_DEFAULT_REPORT_FREQUENCY_MINUTES: u16 = 5;

/// Tag of a supported device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TelemetricDeviceKind {
    #[serde(rename = "LoRA_ARTA")]
    LoraArta,
}

impl TelemetricDeviceKind {
    pub const ALL: [Self; 1] = [Self::LoraArta];

    pub fn code(self) -> &'static str {
        match self {
            Self::LoraArta => "LoRA_ARTA",
        }
    }
}

impl fmt::Display for TelemetricDeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown telemetric device kind: {0}")]
pub struct UnknownDeviceKind(pub String);

impl FromStr for TelemetricDeviceKind {
    type Err = UnknownDeviceKind;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or_else(|| UnknownDeviceKind(code.to_owned()))
    }
}

/// Settings of a LoRA-ARTA flowmeter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoraArtaSettings {
    pub conversion_rate: f64,
    pub report_frequency_minutes: u16,
}

impl Default for LoraArtaSettings {
    fn default() -> Self {
        Self {
            conversion_rate: LORA_ARTA_DEFAULT_CONVERSION_RATE,
            report_frequency_minutes: LORA_ARTA_DEFAULT_REPORT_FREQUENCY_MINUTES,
        }
    }
}

/// Device-type specific settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TelemetricDevice {
    #[serde(rename = "LoRA_ARTA")]
    LoraArta(LoraArtaSettings),
}

impl TelemetricDevice {
    pub fn kind(&self) -> TelemetricDeviceKind {
        match self {
            Self::LoraArta(_) => TelemetricDeviceKind::LoraArta,
        }
    }

    /// Cubic metres represented by one report of `sensor_frequency`.
    fn volume_for(&self, water_percentage: u8, sensor_frequency: f64) -> f64 {
        match self {
            Self::LoraArta(s) => {
                f64::from(water_percentage) / 100.0
                    * f64::from(s.report_frequency_minutes)
                    * sensor_frequency
                    / s.conversion_rate
            }
        }
    }
}

/// Registration of a device feeding automatic records into a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetricDeviceConfig {
    pub field_id: FieldId,
    /// Identifier assigned by the telemetry network.
    pub device_id: String,
    /// Share of the metered water that reaches this field.
    pub water_percentage: u8,
    pub device: TelemetricDevice,
}

impl TelemetricDeviceConfig {
    pub fn kind(&self) -> TelemetricDeviceKind {
        self.device.kind()
    }

    /// Applied volume for one reading.
    ///
    /// # Examples
    /// ```
    /// use irrigation_backend::domain::{
    ///     FieldId, LoraArtaSettings, TelemetricDevice, TelemetricDeviceConfig,
    /// };
    ///
    /// let config = TelemetricDeviceConfig {
    ///     field_id: FieldId::random(),
    ///     device_id: "arta-1".into(),
    ///     water_percentage: 50,
    ///     device: TelemetricDevice::LoraArta(LoraArtaSettings {
    ///         conversion_rate: 2.0,
    ///         report_frequency_minutes: 4,
    ///     }),
    /// };
    /// assert_eq!(config.volume_for(10.0), 10.0);
    /// ```
    pub fn volume_for(&self, sensor_frequency: f64) -> f64 {
        self.device.volume_for(self.water_percentage, sensor_frequency)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut invalid = Vec::new();
        if self.device_id.trim().is_empty() {
            invalid.push("deviceId");
        }
        if !(1..=100).contains(&self.water_percentage) {
            invalid.push("waterPercentage");
        }
        match self.device {
            TelemetricDevice::LoraArta(s) => {
                if !(s.conversion_rate.is_finite() && s.conversion_rate > 0.0) {
                    invalid.push("conversionRate");
                }
                if s.report_frequency_minutes == 0 {
                    invalid.push("reportFrequencyMinutes");
                }
            }
        }
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(DomainError::invalid_request("telemetric device settings are invalid")
                .with_details(json!({ "invalid": invalid })))
        }
    }
}

/// One raw report from the telemetry network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    pub device_id: String,
    pub sensor_frequency: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryReading {
    /// Frequency if the reading carries a usable, non-zero value.
    pub fn usable_frequency(&self) -> Option<f64> {
        self.sensor_frequency.filter(|f| f.is_finite() && *f != 0.0)
    }
}

/// Error returned for a malformed lookback window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lookback must be a positive integer followed by m, h or d, got {0:?}")]
pub struct InvalidLookback(pub String);

/// Lookback window understood by the telemetry network, such as `1d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lookback(String);

impl Lookback {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self("1d".to_owned())
    }
}

impl FromStr for Lookback {
    type Err = InvalidLookback;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidLookback(raw.to_owned());
        let (unit_at, _) = raw.char_indices().last().ok_or_else(invalid)?;
        let (amount, unit) = raw.split_at(unit_at);
        if !matches!(unit, "m" | "h" | "d") {
            return Err(invalid());
        }
        match amount.parse::<u32>() {
            Ok(n) if n > 0 && amount.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(Self(raw.to_owned()))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Lookback {
    type Error = InvalidLookback;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(value: Lookback) -> Self {
        value.0
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(water_percentage: u8, settings: LoraArtaSettings) -> TelemetricDeviceConfig {
        TelemetricDeviceConfig {
            field_id: FieldId::random(),
            device_id: "arta-7".to_owned(),
            water_percentage,
            device: TelemetricDevice::LoraArta(settings),
        }
    }

    #[test]
    fn lora_arta_volume_uses_report_interval_and_conversion() {
        let c = config(50, LoraArtaSettings::default());
        // 0.5 * 5 * 13.6 / 6.8
        assert!((c.volume_for(13.6) - 5.0).abs() < 1e-12);
    }

    #[rstest]
    #[case(0, 6.8, 5, "waterPercentage")]
    #[case(101, 6.8, 5, "waterPercentage")]
    #[case(50, 0.0, 5, "conversionRate")]
    #[case(50, 6.8, 0, "reportFrequencyMinutes")]
    fn invalid_settings_are_rejected(
        #[case] pct: u8,
        #[case] conversion_rate: f64,
        #[case] report_frequency_minutes: u16,
        #[case] name: &str,
    ) {
        let c = config(
            pct,
            LoraArtaSettings {
                conversion_rate,
                report_frequency_minutes,
            },
        );
        let err = c.validate().expect_err("invalid");
        let invalid = err.details().expect("details")["invalid"].clone();
        assert_eq!(invalid, json!([name]));
    }

    #[test]
    fn device_kind_code_round_trips() {
        assert_eq!("LoRA_ARTA".parse(), Ok(TelemetricDeviceKind::LoraArta));
        assert!("lora_arta".parse::<TelemetricDeviceKind>().is_err());
    }

    #[rstest]
    #[case("1d")]
    #[case("12h")]
    #[case("30m")]
    fn accepts_lookback_windows(#[case] raw: &str) {
        assert_eq!(raw.parse::<Lookback>().map(|l| l.to_string()), Ok(raw.to_owned()));
    }

    #[rstest]
    #[case("")]
    #[case("d")]
    #[case("0d")]
    #[case("1w")]
    #[case("+1d")]
    #[case("1 d")]
    #[case("1é")]
    fn rejects_malformed_lookback(#[case] raw: &str) {
        assert!(raw.parse::<Lookback>().is_err());
    }

    #[rstest]
    #[case(Some(0.0), None)]
    #[case(None, None)]
    #[case(Some(2.5), Some(2.5))]
    fn zero_and_missing_frequencies_are_unusable(
        #[case] frequency: Option<f64>,
        #[case] expected: Option<f64>,
    ) {
        let reading = TelemetryReading {
            device_id: "d".to_owned(),
            sensor_frequency: frequency,
            timestamp: Utc::now(),
        };
        assert_eq!(reading.usable_frequency(), expected);
    }
}
